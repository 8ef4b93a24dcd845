//! Response store with TTL and stale-while-revalidate windows
//!
//! Entries are never removed because they aged out; they stay until they are
//! overwritten, invalidated, cleared, or evicted by the optional entry cap.
//!
//! Every invalidation bumps a generation counter. A response fetched before an
//! invalidation is stored with [`ResponseCache::insert_if_current`], which
//! drops it instead of resurrecting data the caller just invalidated.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use souk_core::CacheConfig;
use tracing::debug;

use crate::stats::{CacheStats, StatsRecorder};

mod entry;

pub use entry::{CacheEntry, Freshness};

/// In-memory store of cached GET responses keyed by normalized endpoint
#[derive(Debug, Default)]
pub struct ResponseCache {
    /// Cache storage
    entries: DashMap<String, CacheEntry>,
    /// Hit/miss accounting
    stats: StatsRecorder,
    /// Optional cap on the number of entries
    max_entries: Option<usize>,
    /// Bumped by every invalidation and clear
    generation: AtomicU64,
}

impl ResponseCache {
    /// Create new unbounded response cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache that evicts its oldest entry whenever a write takes it
    /// past `max_entries`. Expired entries are dropped before anything live.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries.max(1)),
            ..Self::default()
        }
    }

    /// Get the entry stored under `key`, whatever its freshness
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    /// Current invalidation generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store a value under `key`, replacing any previous entry
    pub fn insert(&self, key: impl Into<String>, value: Arc<Value>, config: &CacheConfig) {
        self.store(key.into(), value, config, None);
    }

    /// Store a value fetched while the cache was at `generation`.
    ///
    /// Nothing is stored, and `false` is returned, if any invalidation or
    /// clear ran since.
    pub fn insert_if_current(
        &self,
        key: impl Into<String>,
        value: Arc<Value>,
        config: &CacheConfig,
        generation: u64,
    ) -> bool {
        self.store(key.into(), value, config, Some(generation))
    }

    /// Remove every entry whose key equals or starts with `prefix`
    pub fn invalidate(&self, prefix: &str) -> usize {
        self.invalidate_where(prefix, |_| true)
    }

    /// Remove entries under `prefix` for which `predicate` holds
    pub fn invalidate_where<F>(&self, prefix: &str, predicate: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        // Bump first: a write checked against the old generation that lands
        // before the sweep is removed by it
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut removed = 0;
        self.entries.retain(|key, _| {
            if key.starts_with(prefix) && predicate(key) {
                removed += 1;
                false
            } else {
                true
            }
        });
        debug!(prefix, removed, "Invalidated cache entries");
        removed
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }

    /// Remove entries past their stale window
    fn cleanup(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if entry.freshness() == Freshness::Expired {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Get entry count
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count a lookup served from the cache
    pub fn record_hit(&self, key: &str) {
        self.stats.record_hit(key);
    }

    /// Count a lookup that had to go to the network
    pub fn record_miss(&self, key: &str) {
        self.stats.record_miss(key);
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    fn store(&self, key: String, value: Arc<Value>, config: &CacheConfig, generation: Option<u64>) -> bool {
        let entry = CacheEntry::new(key.clone(), value, config);
        {
            // Checked under the shard lock, so a concurrent invalidation either
            // rejects this write or sweeps it afterwards
            let slot = self.entries.entry(key.clone());
            if let Some(expected) = generation {
                if self.generation.load(Ordering::SeqCst) != expected {
                    debug!(key = %key, "Dropping response fetched before an invalidation");
                    return false;
                }
            }
            slot.insert(entry);
        }

        self.enforce_cap(&key);
        true
    }

    /// Shrink back under the cap after a write; concurrent writers each
    /// keep evicting until they observe the cache within bounds
    fn enforce_cap(&self, newest: &str) {
        let max = match self.max_entries {
            Some(max) => max,
            None => return,
        };
        if self.entries.len() <= max {
            return;
        }

        let expired = self.cleanup();
        if expired > 0 {
            debug!(expired, "Dropped expired entries over the cache cap");
        }
        while self.entries.len() > max {
            if !self.evict_oldest(newest) {
                break;
            }
        }
    }

    /// Evict the oldest entry other than `keep`; false if there is none
    fn evict_oldest(&self, keep: &str) -> bool {
        let oldest = self
            .entries
            .iter()
            .filter(|entry| entry.key() != keep)
            .min_by_key(|entry| entry.created_at)
            .map(|entry| entry.key().clone());

        match oldest {
            Some(key) => {
                debug!(key = %key, "Evicting oldest cache entry");
                self.entries.remove(&key);
                true
            },
            None => false,
        }
    }
}
