//! Per-endpoint caching policy.

use std::time::Duration;

/// Caching policy registered for an endpoint prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry is served without revalidation
    pub ttl: Duration,
    /// Window after `ttl` during which the stale value is still served
    /// while a background refresh runs
    pub stale_while_revalidate: Option<Duration>,
}

impl CacheConfig {
    /// Create a config with a TTL and no stale window
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            stale_while_revalidate: None,
        }
    }

    /// Shorthand for `CacheConfig::new(Duration::from_millis(ttl_ms))`
    pub fn from_millis(ttl_ms: u64) -> Self {
        Self::new(Duration::from_millis(ttl_ms))
    }

    /// Add a stale-while-revalidate window
    pub fn with_stale_while_revalidate(mut self, window: Duration) -> Self {
        self.stale_while_revalidate = Some(window);
        self
    }

    /// Stale window, zero when none is configured
    pub fn stale_window(&self) -> Duration {
        self.stale_while_revalidate.unwrap_or(Duration::ZERO)
    }
}
