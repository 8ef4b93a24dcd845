//! Response cache for the Souk request core
//!
//! This crate provides the in-memory store of cached GET responses, the
//! per-endpoint-prefix cache policy table, and hit/miss accounting.
//! Freshness is computed lazily when an entry is read; nothing is evicted
//! by a timer.

pub mod config;
pub mod stats;
pub mod store;

// Re-export main types
pub use config::CacheConfigMap;
pub use stats::{CacheStats, KeyStats};
pub use store::{CacheEntry, Freshness, ResponseCache};
