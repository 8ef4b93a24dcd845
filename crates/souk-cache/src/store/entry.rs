//! Cache entries and derived freshness.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use souk_core::CacheConfig;

/// Freshness of an entry, derived from its age at read time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Younger than its TTL
    Fresh,
    /// Past its TTL but inside the stale-while-revalidate window
    Stale,
    /// Past both windows
    Expired,
}

/// Cached response with the policy it was stored under
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Normalized endpoint the response belongs to
    pub key: String,
    /// Cached response body
    pub value: Arc<Value>,
    /// When the entry was stored
    pub created_at: Instant,
    /// Time-to-live duration
    pub ttl: Duration,
    /// Stale-while-revalidate window after `ttl`
    pub stale_while_revalidate: Duration,
}

impl CacheEntry {
    /// Create cache entry stamped with the current time
    pub fn new(key: String, value: Arc<Value>, config: &CacheConfig) -> Self {
        Self {
            key,
            value,
            created_at: Instant::now(),
            ttl: config.ttl,
            stale_while_revalidate: config.stale_window(),
        }
    }

    /// Get age of cache entry
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Freshness right now
    pub fn freshness(&self) -> Freshness {
        self.freshness_at(self.age())
    }

    /// Freshness of the entry at a given age
    pub fn freshness_at(&self, age: Duration) -> Freshness {
        if age < self.ttl {
            Freshness::Fresh
        } else if age < self.ttl + self.stale_while_revalidate {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }
}
