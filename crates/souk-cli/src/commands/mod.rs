//! Command implementations and dispatch logic.
//!
//! Each command is an async function that takes a CommandContext.

use std::collections::HashMap;

use camino::Utf8PathBuf;
use souk_client::{ApiClient, HttpMethod};
use souk_config::{ConfigLayering, ConfigLoader, ConfigSource, SoukConfig};
use souk_core::error::{SoukError, SoukResult};
use tracing::info;

pub mod check;
pub mod request;


use crate::output::OutputHandler;
use crate::Commands;

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
    /// Flag overrides from the command line
    pub overrides: HashMap<String, String>,
    /// Per-user config location; `None` uses `~/.souk/config.toml`
    pub global_config: Option<Utf8PathBuf>,
}

impl CommandContext {
    /// Create a new command context
    pub fn new(overrides: HashMap<String, String>) -> SoukResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| SoukError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| {
            SoukError::config("cwd", format!("Working directory {} is not valid UTF-8", path.display()))
        })?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
            overrides,
            global_config: None,
        })
    }

    /// Resolve the effective configuration for this invocation
    pub async fn load_config(&self) -> SoukResult<(SoukConfig, Vec<ConfigSource>)> {
        let mut loader = ConfigLoader::new(self.cwd.clone());
        if let Some(path) = &self.global_config {
            loader = loader.with_global_path(path.clone());
        }
        loader
            .load(ConfigLayering::collect_env_overrides(), self.overrides.clone())
            .await
    }

    /// Build a request core client from the effective configuration
    pub async fn client(&self) -> SoukResult<ApiClient> {
        let (config, _) = self.load_config().await?;
        build_client(&config)
    }
}

/// Translate a resolved configuration into an `ApiClient`
pub fn build_client(config: &SoukConfig) -> SoukResult<ApiClient> {
    let mut builder = ApiClient::builder()
        .base_url(config.client.base_url.clone())
        .timeout(config.timeout())
        .retry(config.retry_config());

    if let Some(user_agent) = &config.client.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }
    if let Some(max_idle) = config.client.pool_max_idle_per_host {
        builder = builder.pool_max_idle_per_host(max_idle);
    }
    if let Some(threshold) = config.slow_call_threshold() {
        builder = builder.slow_call_threshold(threshold);
    }
    if let Some(max_entries) = config.client.max_cache_entries {
        builder = builder.max_cache_entries(max_entries);
    }
    if let Some(auth) = &config.auth {
        builder = builder.auth_token(auth.token.clone());
    }
    for (prefix, cache_config) in config.cache_configs() {
        builder = builder.cache_for(prefix, cache_config);
    }

    builder.build()
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> SoukResult<()> {
    match command {
        Commands::Get { endpoint, load } => {
            info!("GET {} (repeat: {}, concurrent: {})", endpoint, load.repeat, load.concurrent);
            request::execute(HttpMethod::Get, endpoint, None, load, ctx).await
        },
        Commands::Post { endpoint, data, load } => {
            info!("POST {}", endpoint);
            request::execute(HttpMethod::Post, endpoint, data, load, ctx).await
        },
        Commands::Put { endpoint, data, load } => {
            info!("PUT {}", endpoint);
            request::execute(HttpMethod::Put, endpoint, data, load, ctx).await
        },
        Commands::Patch { endpoint, data, load } => {
            info!("PATCH {}", endpoint);
            request::execute(HttpMethod::Patch, endpoint, data, load, ctx).await
        },
        Commands::Delete { endpoint, load } => {
            info!("DELETE {}", endpoint);
            request::execute(HttpMethod::Delete, endpoint, None, load, ctx).await
        },
        Commands::Check { print } => {
            info!("Checking configuration");
            check::execute(ctx, print).await
        },
        Commands::Version => show_version(ctx),
    }
}

/// Report an unrecognized command, suggesting the closest known one
pub fn unknown_command(input: &str, ctx: &CommandContext) -> SoukResult<()> {
    ctx.output.error(&format!("Unknown command '{}'", input));
    if let Some(suggestion) = suggest_similar_command(input) {
        ctx.output.info(&format!("Did you mean '{}'?", suggestion));
    }
    ctx.output.info("");
    ctx.output.info("Run 'souk help' to see available commands.");

    Err(SoukError::InvalidRequest {
        reason: format!("Unknown command: {}", input),
    })
}

/// Show help information
pub fn show_help(ctx: &CommandContext) -> SoukResult<()> {
    ctx.output.info("souk - Souk API request core");
    ctx.output.info("");
    ctx.output.info("Usage: souk [COMMAND] [OPTIONS]");
    ctx.output.info("");
    ctx.output.info("Requests:");
    ctx.output.info("  get <endpoint>              GET through the cache and dedup path");
    ctx.output.info("  post <endpoint> -d <json>   POST a JSON body");
    ctx.output.info("  put <endpoint> -d <json>    PUT a JSON body");
    ctx.output.info("  patch <endpoint> -d <json>  PATCH a JSON body");
    ctx.output.info("  delete <endpoint>           DELETE an endpoint");
    ctx.output.info("");
    ctx.output.info("  --repeat <n>       Sequential rounds (shows cache hits)");
    ctx.output.info("  --concurrent <n>   Identical requests per round (shows dedup)");
    ctx.output.info("");
    ctx.output.info("Meta:");
    ctx.output.info("  check [--print]    Validate and show configuration");
    ctx.output.info("  version            Show version information");
    ctx.output.info("");
    ctx.output.info("Run 'souk <command> --help' for more information on a command.");
    Ok(())
}

fn show_version(ctx: &CommandContext) -> SoukResult<()> {
    ctx.output.info(&format!("souk v{}", env!("CARGO_PKG_VERSION")));
    ctx.output.info(&format!("Built: {}", env!("SOUK_BUILD_DATE")));
    ctx.output.info(&format!("Target: {}", env!("SOUK_BUILD_TARGET")));
    ctx.output.info(&format!("Rust: {}", env!("SOUK_RUSTC_VERSION")));
    Ok(())
}

/// Suggest similar commands based on edit distance
pub fn suggest_similar_command(input: &str) -> Option<String> {
    let commands = ["get", "post", "put", "patch", "delete", "check", "version", "help"];

    commands
        .iter()
        .map(|&command| (edit_distance(&input.to_lowercase(), command), command))
        .filter(|&(distance, _)| distance <= 2)
        .min_by_key(|&(distance, _)| distance)
        .map(|(_, command)| command.to_string())
}

/// Levenshtein distance between two strings
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    // Single rolling row
    let mut row: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, a_char) in a_chars.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            let next = (row[j] + 1).min(row[j + 1] + 1).min(diagonal + cost);
            diagonal = row[j + 1];
            row[j + 1] = next;
        }
    }

    row[b_chars.len()]
}
