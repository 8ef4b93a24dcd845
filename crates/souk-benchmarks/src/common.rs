//! Common utilities for benchmarks

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};
use serde_json::{json, Value};
use souk_client::{ApiRequest, Transport};
use souk_core::SoukResult;

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_secs(2))
        .measurement_time(Duration::from_secs(8))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// Transport answering every request after a fixed latency, without a network
pub struct StaticTransport {
    latency: Duration,
    calls: AtomicU64,
}

impl StaticTransport {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn execute(&self, request: &ApiRequest) -> SoukResult<Value> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(json!({ "endpoint": request.endpoint, "items": sample_payload(16) }))
    }
}

/// A listing-shaped JSON payload with `items` entries
pub fn sample_payload(items: usize) -> Value {
    let listings: Vec<Value> = (0..items)
        .map(|i| {
            json!({
                "id": i,
                "title": format!("Listing {}", i),
                "price": { "amount": 1000 + i, "currency": "EUR" },
                "tags": ["furniture", "used"],
            })
        })
        .collect();
    Value::Array(listings)
}
