//! Per-endpoint-prefix cache policy table
//!
//! Only endpoints matching a registered prefix are cacheable. When several
//! prefixes match, the longest one wins.

use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::RwLock;
use souk_core::CacheConfig;
use tracing::info;

/// Mapping from endpoint prefix to caching policy
#[derive(Debug, Default)]
pub struct CacheConfigMap {
    configs: RwLock<IndexMap<String, CacheConfig>>,
}

impl CacheConfigMap {
    /// Create an empty table; nothing is cacheable until configured
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the policy for `prefix`
    pub fn configure(&self, prefix: impl Into<String>, config: CacheConfig) {
        let prefix = prefix.into();
        info!(prefix = %prefix, ttl_ms = config.ttl.as_millis() as u64, "Configured caching");
        self.configs.write().insert(prefix, config);
    }

    /// Register several policies at once
    pub fn configure_many<I, K>(&self, configs: I)
    where
        I: IntoIterator<Item = (K, CacheConfig)>,
        K: Into<String>,
    {
        let mut table = self.configs.write();
        for (prefix, config) in configs {
            table.insert(prefix.into(), config);
        }
    }

    /// Remove the policy for `prefix`
    pub fn remove(&self, prefix: &str) -> Option<CacheConfig> {
        self.configs.write().shift_remove(prefix)
    }

    /// Change the TTL for `prefix`, registering it with no stale window if absent
    pub fn update_ttl(&self, prefix: &str, ttl: Duration) -> CacheConfig {
        let mut table = self.configs.write();
        let config = table
            .entry(prefix.to_string())
            .and_modify(|config| config.ttl = ttl)
            .or_insert_with(|| CacheConfig::new(ttl));
        *config
    }

    /// Policy for an endpoint: the longest registered prefix it starts with
    pub fn resolve(&self, endpoint: &str) -> Option<CacheConfig> {
        self.configs
            .read()
            .iter()
            .filter(|(prefix, _)| endpoint.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, config)| *config)
    }

    /// Copy of every registered policy in registration order
    pub fn snapshot(&self) -> IndexMap<String, CacheConfig> {
        self.configs.read().clone()
    }

    pub fn len(&self) -> usize {
        self.configs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.read().is_empty()
    }
}
