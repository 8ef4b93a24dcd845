//! Policy types shared by the Souk crates.
//!
//! - `HttpMethod` for the verbs the request core issues
//! - `CacheConfig` for per-endpoint-prefix caching policy
//! - `RetryConfig` and `Backoff` for the retry controller

pub mod cache;
pub mod method;
pub mod retry;

// Re-export all public types
pub use cache::CacheConfig;
pub use method::HttpMethod;
pub use retry::{Backoff, RetryConfig};
