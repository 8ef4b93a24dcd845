//! Hit/miss accounting
//!
//! Counters only ever increase; a fresh client starts from zero.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Hit/miss counters for one cache key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyStats {
    pub hits: u64,
    pub misses: u64,
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of entries currently stored, whatever their freshness
    pub cache_size: usize,
    /// Lookups answered from the cache, fresh or stale
    pub hits: u64,
    /// Lookups that went to the network
    pub misses: u64,
    /// `hits / (hits + misses)`, zero before the first lookup
    pub hit_rate: f64,
    /// Counters per normalized endpoint
    pub per_key: HashMap<String, KeyStats>,
}

/// Thread-safe recorder behind `CacheStats`
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    per_key: DashMap<String, KeyStats>,
}

impl StatsRecorder {
    pub(crate) fn record_hit(&self, key: &str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.per_key.entry(key.to_string()).or_default().hits += 1;
    }

    pub(crate) fn record_miss(&self, key: &str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.per_key.entry(key.to_string()).or_default().misses += 1;
    }

    pub(crate) fn snapshot(&self, cache_size: usize) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        CacheStats {
            cache_size,
            hits,
            misses,
            hit_rate,
            per_key: self
                .per_key
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }
}
