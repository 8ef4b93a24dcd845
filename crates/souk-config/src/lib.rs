//! Configuration loading for the Souk request core
//!
//! This crate handles parsing and validation of souk.toml and souk.json files,
//! layering them with the global config, environment and CLI overrides.

pub mod json;
pub mod merge;
pub mod toml;

// Re-export main types
pub use crate::merge::{ConfigLayering, ConfigLoader, ConfigSource, CONFIG_JSON, CONFIG_TOML};
pub use crate::toml::{AuthSection, BackoffSection, CacheSection, ClientSection, RetrySection, SoukConfig};

use souk_core::error::SoukError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, SoukError>;
