//! souk.toml configuration parsing and serialization

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use souk_core::error::SoukError;
use souk_core::{CacheConfig, RetryConfig};
use url::Url;

use crate::ConfigResult;

/// Complete souk.toml configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SoukConfig {
    /// HTTP client settings
    #[serde(default)]
    pub client: ClientSection,

    /// Retry policy
    #[serde(default)]
    pub retry: RetrySection,

    /// Cache policies keyed by endpoint prefix, in declaration order
    #[serde(default)]
    pub cache: IndexMap<String, CacheSection>,

    /// API credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSection>,
}

/// `[client]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSection {
    /// Base URL every endpoint is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Idle connections kept per host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_max_idle_per_host: Option<usize>,

    /// Exchanges slower than this are reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_call_threshold_ms: Option<u64>,

    /// Upper bound on cached responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cache_entries: Option<usize>,
}

/// `[retry]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default)]
    pub backoff: BackoffSection,
}

/// `[retry.backoff]` section
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum BackoffSection {
    #[default]
    Fixed,
    Exponential {
        multiplier: f64,
        max_delay_ms: u64,
    },
}

/// One `[cache."<prefix>"]` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSection {
    pub ttl_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_while_revalidate_ms: Option<u64>,
}

/// `[auth]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSection {
    /// Bearer token
    pub token: String,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            user_agent: None,
            pool_max_idle_per_host: None,
            slow_call_threshold_ms: None,
            max_cache_entries: None,
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            backoff: BackoffSection::Fixed,
        }
    }
}

impl SoukConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.client.timeout_ms)
    }

    pub fn slow_call_threshold(&self) -> Option<Duration> {
        self.client.slow_call_threshold_ms.map(Duration::from_millis)
    }

    /// Retry policy described by the `[retry]` section
    pub fn retry_config(&self) -> RetryConfig {
        let config = RetryConfig::fixed(
            self.retry.max_retries,
            Duration::from_millis(self.retry.retry_delay_ms),
        );
        match self.retry.backoff {
            BackoffSection::Fixed => config,
            BackoffSection::Exponential {
                multiplier,
                max_delay_ms,
            } => config.with_exponential_backoff(multiplier, Duration::from_millis(max_delay_ms)),
        }
    }

    /// Cache policies in declaration order
    pub fn cache_configs(&self) -> Vec<(String, CacheConfig)> {
        self.cache
            .iter()
            .map(|(prefix, section)| (prefix.clone(), section.to_cache_config()))
            .collect()
    }
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        let config = CacheConfig::from_millis(self.ttl_ms);
        match self.stale_while_revalidate_ms {
            Some(window) => config.with_stale_while_revalidate(Duration::from_millis(window)),
            None => config,
        }
    }
}

/// Parse TOML string to SoukConfig configuration
pub fn parse_souk_toml(content: &str) -> ConfigResult<SoukConfig> {
    // First try with toml_edit for better error reporting
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| SoukError::TomlParse {
            message: format!("TOML syntax error: {}", e),
        })?;

    // Then parse with serde for type safety
    let config: SoukConfig = toml::from_str(content).map_err(|e| SoukError::TomlParse {
        message: format!("TOML parsing error: {}", e),
    })?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize SoukConfig to TOML string
pub fn serialize_souk_toml(config: &SoukConfig) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| SoukError::TomlParse {
        message: format!("TOML serialization error: {}", e),
    })
}

/// Validate configuration values
pub fn validate_config(config: &SoukConfig) -> ConfigResult<()> {
    let base_url = config.client.base_url.trim();
    if base_url.is_empty() {
        return Err(SoukError::config("client.base_url", "Base URL is required"));
    }
    match Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {},
        Ok(url) => {
            return Err(SoukError::config(
                "client.base_url",
                format!("Unsupported scheme '{}', expected http or https", url.scheme()),
            ))
        },
        Err(e) => {
            return Err(SoukError::config(
                "client.base_url",
                format!("'{}' is not a valid URL: {}", base_url, e),
            ))
        },
    }

    if config.client.timeout_ms == 0 {
        return Err(SoukError::config("client.timeout_ms", "Timeout must be greater than zero"));
    }

    if config.client.max_cache_entries == Some(0) {
        return Err(SoukError::config(
            "client.max_cache_entries",
            "Cache entry limit must be greater than zero",
        ));
    }

    if let BackoffSection::Exponential { multiplier, .. } = config.retry.backoff {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(SoukError::config(
                "retry.backoff.multiplier",
                format!("Backoff multiplier must be positive, got {}", multiplier),
            ));
        }
    }

    for (prefix, section) in &config.cache {
        validate_cache_section(prefix, section)?;
    }

    if let Some(auth) = &config.auth {
        if auth.token.trim().is_empty() {
            return Err(SoukError::config("auth.token", "Token must not be empty"));
        }
    }

    Ok(())
}

/// Load and parse souk.toml from file path
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<SoukConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SoukError::io(format!("Failed to read {}", path), e))?;

    parse_souk_toml(&content).map_err(|e| match e {
        SoukError::TomlParse { message } => SoukError::TomlParse {
            message: format!("In file {}: {}", path, message),
        },
        SoukError::Config { field, reason } => SoukError::Config {
            field,
            reason: format!("In file {}: {}", path, reason),
        },
        other => other,
    })
}

fn validate_cache_section(prefix: &str, section: &CacheSection) -> ConfigResult<()> {
    if !prefix.starts_with('/') {
        return Err(SoukError::config(
            format!("cache.{}", prefix),
            "Cache prefixes must start with '/'",
        ));
    }

    if section.ttl_ms == 0 {
        return Err(SoukError::config(
            format!("cache.{}.ttl_ms", prefix),
            "TTL must be greater than zero",
        ));
    }

    Ok(())
}
