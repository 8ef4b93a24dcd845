//! Fire-and-forget analytics events
//!
//! The core calls its sink synchronously and never depends on the outcome.

use std::time::Duration;

use souk_core::HttpMethod;
use tracing::{debug, warn};

/// Event emitted by the request core
#[derive(Debug, Clone, PartialEq)]
pub enum ApiEvent {
    /// A read was answered from the cache
    CacheHit { key: String, stale: bool },
    /// A cacheable read had to go to the network
    CacheMiss { key: String },
    /// A network exchange took longer than the slow-call threshold
    SlowCall {
        method: HttpMethod,
        endpoint: String,
        duration: Duration,
    },
    /// A request failed with a classified error
    ApiError {
        method: HttpMethod,
        endpoint: String,
        kind: &'static str,
        status: Option<u16>,
    },
}

/// Consumer of analytics events
pub trait EventSink: Send + Sync {
    fn record(&self, event: ApiEvent);
}

/// Sink that forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: ApiEvent) {
        match event {
            ApiEvent::CacheHit { key, stale } => debug!(key = %key, stale, "Cache hit"),
            ApiEvent::CacheMiss { key } => debug!(key = %key, "Cache miss"),
            ApiEvent::SlowCall {
                method,
                endpoint,
                duration,
            } => warn!(
                %method,
                endpoint = %endpoint,
                duration_ms = duration.as_millis() as u64,
                "Slow API call"
            ),
            ApiEvent::ApiError {
                method,
                endpoint,
                kind,
                status,
            } => warn!(%method, endpoint = %endpoint, kind, ?status, "API error"),
        }
    }
}
