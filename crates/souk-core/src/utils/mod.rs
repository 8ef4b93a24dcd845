//! Utility functions and helpers.
//!
//! Endpoint normalization and request fingerprinting used by the cache and
//! the in-flight registry.

pub mod endpoint;
pub mod fingerprint;
pub mod hash;

// Re-export commonly used utilities
pub use endpoint::{normalize_endpoint, request_target};
pub use fingerprint::Fingerprint;
pub use hash::json_digest;
