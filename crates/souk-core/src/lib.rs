//! # souk-core
//!
//! Core types and utilities shared across all Souk crates.
//!
//! This crate provides:
//! - `SoukError`, the classified error taxonomy every caller receives
//! - `Fingerprint`, the key identifying "the same logical request"
//! - Cache and retry policy types shared by the client and config crates
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Policy types (`CacheConfig`, `RetryConfig`, `HttpMethod`)
//! - `error`: Error types and result aliases
//! - `utils`: Endpoint normalization and request fingerprinting

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{SoukError, SoukResult};
pub use types::{Backoff, CacheConfig, HttpMethod, RetryConfig};
pub use utils::{normalize_endpoint, request_target, Fingerprint};
