//! Retry controller
//!
//! Runs one logical request as up to `1 + max_retries` transport calls,
//! sleeping between attempts. Only errors that classify as retryable are
//! repeated; the abort signal is honored before, during and between attempts.

use std::sync::Arc;

use serde_json::Value;
use souk_core::error::SoukError;
use souk_core::{Fingerprint, RetryConfig};
use tracing::{debug, warn};

use crate::inflight::AbortSignal;
use crate::transport::{ApiRequest, Transport};
use crate::ClientResult;

/// Wraps a transport with the retry policy
#[derive(Clone)]
pub struct RetryController {
    transport: Arc<dyn Transport>,
}

impl RetryController {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Execute `request`, retrying transient failures per `config`
    pub async fn execute(
        &self,
        request: &ApiRequest,
        config: &RetryConfig,
        signal: &AbortSignal,
        fingerprint: &Fingerprint,
    ) -> ClientResult<Value> {
        let cancelled = || SoukError::Cancelled {
            fingerprint: fingerprint.to_string(),
        };
        let mut last_error = None;

        for attempt in 0..=config.max_retries {
            if signal.is_aborted() {
                return Err(cancelled());
            }

            let outcome = tokio::select! {
                biased;
                _ = signal.aborted() => return Err(cancelled()),
                outcome = self.transport.execute(request) => outcome,
            };

            match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(%fingerprint, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                },
                Err(error) => {
                    // Don't retry errors the server will repeat
                    if !error.is_retryable() {
                        return Err(error);
                    }

                    // Don't retry on final attempt
                    if attempt == config.max_retries {
                        last_error = Some(error);
                        break;
                    }

                    let delay = config.delay_for(attempt);
                    warn!(
                        %fingerprint,
                        attempt = attempt + 1,
                        max_attempts = config.max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Request failed, retrying"
                    );
                    last_error = Some(error);

                    tokio::select! {
                        biased;
                        _ = signal.aborted() => return Err(cancelled()),
                        _ = tokio::time::sleep(delay) => {},
                    }
                },
            }
        }

        Err(last_error.unwrap_or_else(|| SoukError::Network {
            message: "Retry operation failed without error".to_string(),
            source: None,
        }))
    }
}
