//! `souk get|post|put|patch|delete` implementation.
//!
//! Every round issues `--concurrent` identical requests at once, so the
//! summary shows how many were answered by the cache or merged in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::Value;
use souk_client::{ApiClient, CacheStats, HttpMethod};
use souk_core::error::{SoukError, SoukResult};
use tracing::debug;

use super::CommandContext;
use crate::LoadArgs;

/// Outcome of a load run
#[derive(Debug)]
pub struct RunSummary {
    pub requests: u64,
    pub elapsed: Duration,
    /// Response of the final request
    pub last: Arc<Value>,
    pub stats: CacheStats,
}

/// Execute a request command
pub async fn execute(
    method: HttpMethod,
    endpoint: String,
    data: Option<String>,
    load: LoadArgs,
    ctx: &CommandContext,
) -> SoukResult<()> {
    let body = parse_body(method, data.as_deref())?;
    let client = ctx.client().await?;

    ctx.output.step(method.as_str(), &format!("{}{}", client.base_url(), endpoint));
    let summary = run(&client, method, &endpoint, body, load).await?;

    ctx.output.json(&summary.last);
    ctx.output.summary(&summary);
    Ok(())
}

/// Issue the request `repeat` rounds of `concurrent` calls each
pub async fn run(
    client: &ApiClient,
    method: HttpMethod,
    endpoint: &str,
    body: Option<Value>,
    load: LoadArgs,
) -> SoukResult<RunSummary> {
    let started = Instant::now();
    let mut requests = 0u64;
    let mut last = None;

    for round in 0..load.repeat.max(1) {
        let calls = (0..load.concurrent.max(1)).map(|_| client.request_value(method, endpoint, body.clone()));
        let results = join_all(calls).await;
        debug!(round, issued = results.len(), "Round finished");

        for result in results {
            requests += 1;
            last = Some(result?);
        }
    }

    let last = last.ok_or_else(|| SoukError::InvalidRequest {
        reason: "No requests were issued".to_string(),
    })?;

    Ok(RunSummary {
        requests,
        elapsed: started.elapsed(),
        last,
        stats: client.cache_stats(),
    })
}

/// Parse the `--data` argument; only methods with bodies accept one
pub fn parse_body(method: HttpMethod, data: Option<&str>) -> SoukResult<Option<Value>> {
    match (method, data) {
        (HttpMethod::Get | HttpMethod::Delete, Some(_)) => Err(SoukError::InvalidRequest {
            reason: format!("{} requests do not take a body", method),
        }),
        (_, Some(raw)) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| SoukError::InvalidRequest {
                reason: format!("--data is not valid JSON: {}", e),
            }),
        (HttpMethod::Get | HttpMethod::Delete, None) => Ok(None),
        (_, None) => Ok(Some(Value::Object(Default::default()))),
    }
}
