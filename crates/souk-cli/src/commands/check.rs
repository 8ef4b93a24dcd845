//! `souk check` command implementation.

use souk_config::toml::serialize_souk_toml;
use souk_config::ConfigSource;
use souk_core::error::SoukResult;
use souk_core::Backoff;

use super::{build_client, CommandContext};

/// Validate the effective configuration and print it.
///
/// With `print` the merged configuration is also written out as a souk.toml
/// document that reloads to the same settings.
pub async fn execute(ctx: &CommandContext, print: bool) -> SoukResult<()> {
    ctx.output.step("check", "Checking configuration");

    let (config, sources) = ctx.load_config().await?;
    if sources.is_empty() {
        ctx.output.warn("No configuration found, using defaults");
    }
    for source in &sources {
        ctx.output.info(&format!("  source: {}", describe_source(source)));
    }

    // Building the client validates the transport settings too
    let client = build_client(&config)?;

    let retry = client.retry_config();
    ctx.output.info(&format!("  base_url: {}", client.base_url()));
    ctx.output.info(&format!("  timeout: {} ms", config.client.timeout_ms));
    let backoff = match retry.backoff {
        Backoff::Fixed => "fixed".to_string(),
        Backoff::Exponential {
            multiplier,
            max_delay,
        } => format!("exponential x{} up to {} ms", multiplier, max_delay.as_millis()),
    };
    ctx.output.info(&format!(
        "  retry: {} retries, {} ms delay, {}",
        retry.max_retries,
        retry.retry_delay.as_millis(),
        backoff
    ));

    let caches = client.cache_configurations();
    if caches.is_empty() {
        ctx.output.info("  cache: nothing is cacheable");
    }
    for (prefix, cache) in &caches {
        ctx.output.info(&format!(
            "  cache {}: ttl {} ms, stale window {} ms",
            prefix,
            cache.ttl.as_millis(),
            cache.stale_window().as_millis()
        ));
    }

    if print {
        ctx.output.document(&serialize_souk_toml(&config)?);
    }

    ctx.output.success("Configuration is valid");
    Ok(())
}

fn describe_source(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Global(path) => format!("global {}", path),
        ConfigSource::ProjectToml(path) | ConfigSource::ProjectJson(path) => path.to_string(),
        ConfigSource::Environment(key) => format!("environment {}", key),
        ConfigSource::CommandLine => "command line flags".to_string(),
    }
}
