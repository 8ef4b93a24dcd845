//! Request deduplication benchmarks
//!
//! Fires bursts of identical requests at an `ApiClient` backed by an
//! in-memory transport, so the numbers reflect registry and cache overhead
//! rather than the network.

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use futures::future::join_all;
use souk_benchmarks::{criterion_config, StaticTransport};
use souk_client::{ApiClient, RetryConfig, Transport};
use souk_core::CacheConfig;

fn client_with(transport: Arc<StaticTransport>, cached: bool) -> ApiClient {
    let mut builder = ApiClient::builder()
        .base_url("http://bench.souk.test")
        .retry(RetryConfig::disabled())
        .transport(transport as Arc<dyn Transport>);
    if cached {
        builder = builder.cache_for("/listings", CacheConfig::from_millis(60_000));
    }
    builder.build().unwrap()
}

fn bench_concurrent_identical_gets(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("concurrent_identical_gets");

    for burst in [1, 8, 64, 256].iter() {
        group.throughput(Throughput::Elements(*burst as u64));

        group.bench_with_input(BenchmarkId::new("deduplicated", burst), burst, |b, &burst| {
            let transport = Arc::new(StaticTransport::new(Duration::from_micros(200)));
            let client = client_with(transport, false);

            b.to_async(&runtime).iter(|| {
                let client = client.clone();
                async move {
                    let calls = (0..burst).map(|_| client.get_value("/listings/featured"));
                    black_box(join_all(calls).await)
                }
            });
        });
    }

    group.finish();
}

fn bench_cached_reads(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("cached_reads");

    let transport = Arc::new(StaticTransport::new(Duration::ZERO));
    let client = client_with(transport.clone(), true);
    runtime.block_on(client.get_value("/listings/featured")).unwrap();

    group.bench_function("fresh_hit", |b| {
        b.to_async(&runtime)
            .iter(|| async { black_box(client.get_value("/listings/featured").await) });
    });

    group.bench_function("uncached_write", |b| {
        let body = serde_json::json!({ "title": "Oak table" });
        b.to_async(&runtime).iter(|| async {
            black_box(client.post_value("/listings", body.clone()).await)
        });
    });

    group.finish();
    assert!(transport.calls() >= 1);
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_concurrent_identical_gets, bench_cached_reads
}
criterion_main!(benches);
