//! Response cache benchmarks
//!
//! Covers lookups against a populated store, inserts under a size cap, and
//! prefix resolution in the policy table.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use souk_benchmarks::{criterion_config, sample_payload};
use souk_cache::{CacheConfigMap, ResponseCache};
use souk_core::CacheConfig;

fn populated_cache(entries: usize) -> ResponseCache {
    let cache = ResponseCache::new();
    let config = CacheConfig::from_millis(60_000);
    let payload = Arc::new(sample_payload(4));
    for i in 0..entries {
        cache.insert(format!("/listings/{}", i), payload.clone(), &config);
    }
    cache
}

fn bench_cache_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_lookup");

    for entries in [100, 1_000, 10_000].iter() {
        let cache = populated_cache(*entries);

        group.bench_with_input(BenchmarkId::new("hit", entries), entries, |b, &entries| {
            let mut index = 0;
            b.iter(|| {
                let key = format!("/listings/{}", index % entries);
                index += 1;
                black_box(cache.get(&key))
            });
        });

        group.bench_with_input(BenchmarkId::new("miss", entries), &cache, |b, cache| {
            b.iter(|| black_box(cache.get("/messages/unknown")));
        });
    }

    group.finish();
}

fn bench_cache_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_insert");
    group.throughput(Throughput::Elements(1));

    let config = CacheConfig::from_millis(60_000);
    let payload = Arc::new(sample_payload(4));

    group.bench_function("unbounded", |b| {
        let cache = ResponseCache::new();
        let mut index = 0u64;
        b.iter(|| {
            cache.insert(format!("/feed/{}", index % 4_096), payload.clone(), &config);
            index += 1;
        });
    });

    group.bench_function("capped_evicting", |b| {
        let cache = ResponseCache::with_max_entries(256);
        let mut index = 0u64;
        b.iter(|| {
            cache.insert(format!("/feed/{}", index), payload.clone(), &config);
            index += 1;
        });
    });

    group.bench_function("invalidate_prefix", |b| {
        b.iter_batched(
            || populated_cache(1_000),
            |cache| black_box(cache.invalidate("/listings/1")),
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_prefix_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("prefix_resolution");

    for prefixes in [4, 32, 128].iter() {
        let map = CacheConfigMap::new();
        for i in 0..*prefixes {
            map.configure(format!("/service{}", i), CacheConfig::from_millis(1_000));
        }

        group.bench_with_input(BenchmarkId::new("resolve", prefixes), &map, |b, map| {
            b.iter(|| black_box(map.resolve("/service3/items?page=1")));
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_cache_lookup, bench_cache_insert, bench_prefix_resolution
}
criterion_main!(benches);
