//! Error types and result aliases for Souk operations.
//!
//! Every failure a caller can observe is classified into one variant of
//! `SoukError`. The type is `Clone` so a single settled outcome can be handed
//! to every caller attached to the same in-flight request.

use std::sync::Arc;
use thiserror::Error;

/// Unified error type for all Souk operations
#[derive(Error, Debug, Clone)]
pub enum SoukError {
    // API errors
    #[error("Authentication required for {endpoint}. Please sign in again")]
    Unauthorized { endpoint: String },

    #[error("Access to {endpoint} is forbidden")]
    Forbidden { endpoint: String },

    #[error("Resource not found: {endpoint}")]
    NotFound { endpoint: String },

    #[error("Too many requests to {endpoint}. Please wait {retry_after_seconds} seconds before trying again")]
    RateLimited {
        endpoint: String,
        retry_after_seconds: u64,
    },

    #[error("Request to {endpoint} was rejected with status {status}: {message}")]
    ClientError {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Service unavailable: {endpoint} returned status {status}")]
    ServiceUnavailable { endpoint: String, status: u16 },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Request cancelled: {fingerprint}")]
    Cancelled { fingerprint: String },

    #[error("Failed to parse response from {endpoint}: {message}")]
    Parse { endpoint: String, message: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    // Config errors
    #[error("Failed to parse souk.toml: {message}")]
    TomlParse { message: String },

    #[error("Failed to parse souk.json: {message}")]
    JsonParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    Config { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Result type alias for Souk operations
pub type SoukResult<T> = Result<T, SoukError>;

impl SoukError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Arc::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io {
            message,
            source: Arc::new(source),
        }
    }

    /// Create a configuration validation error
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the retry controller may re-attempt the call that produced this error.
    ///
    /// Rate limiting is deliberately excluded: the caller has to honor the
    /// server's wait instead.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SoukError::ServiceUnavailable { .. }
                | SoukError::Network { .. }
                | SoukError::Parse { .. }
        )
    }

    /// Check if this error is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SoukError::Cancelled { .. })
    }

    /// HTTP status associated with this error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            SoukError::Unauthorized { .. } => Some(401),
            SoukError::Forbidden { .. } => Some(403),
            SoukError::NotFound { .. } => Some(404),
            SoukError::RateLimited { .. } => Some(429),
            SoukError::ClientError { status, .. } => Some(*status),
            SoukError::ServiceUnavailable { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Stable short label for analytics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            SoukError::Unauthorized { .. } => "unauthorized",
            SoukError::Forbidden { .. } => "forbidden",
            SoukError::NotFound { .. } => "not_found",
            SoukError::RateLimited { .. } => "rate_limited",
            SoukError::ClientError { .. } => "client_error",
            SoukError::ServiceUnavailable { .. } => "service_unavailable",
            SoukError::Network { .. } => "network",
            SoukError::Cancelled { .. } => "cancelled",
            SoukError::Parse { .. } => "parse",
            SoukError::InvalidRequest { .. } => "invalid_request",
            SoukError::TomlParse { .. } => "toml_parse",
            SoukError::JsonParse { .. } => "json_parse",
            SoukError::Config { .. } => "config",
            SoukError::Io { .. } => "io",
        }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            SoukError::Unauthorized { .. } => Some("Sign in again to refresh your session"),
            SoukError::Forbidden { .. } => Some("Check that your account has access to this resource"),
            SoukError::NotFound { .. } => Some("Check the endpoint path and any identifiers in it"),
            SoukError::RateLimited { .. } => Some("Wait for the indicated time before retrying"),
            SoukError::ServiceUnavailable { .. } => Some("The service is having trouble; try again later"),
            SoukError::Network { .. } => Some("Check your internet connection and try again"),
            SoukError::TomlParse { .. } | SoukError::Config { .. } => {
                Some("Run 'souk check' to validate your configuration")
            },
            _ => None,
        }
    }
}
