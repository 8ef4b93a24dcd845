//! Error classification
//!
//! Maps HTTP statuses and transport failures onto `SoukError`. Retryability
//! follows from the variant (see `SoukError::is_retryable`).

use std::sync::Arc;

use serde_json::Value;
use souk_core::error::SoukError;
use tracing::info;

use crate::session::{SessionStore, SESSION_KEY};

/// Wait assumed when a 429 carries no usable `Retry-After` header
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Classifies failed exchanges into the error taxonomy
#[derive(Clone)]
pub struct ErrorClassifier {
    session: Arc<dyn SessionStore>,
}

impl ErrorClassifier {
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        Self { session }
    }

    /// Classify a non-success HTTP response.
    ///
    /// A 401 clears the persisted session entry before the error is returned.
    pub fn classify_status(
        &self,
        status: u16,
        retry_after: Option<&str>,
        endpoint: &str,
        body: &str,
    ) -> SoukError {
        let endpoint = endpoint.to_string();
        match status {
            401 => {
                info!(endpoint = %endpoint, "Session rejected, clearing stored user");
                self.session.remove(SESSION_KEY);
                SoukError::Unauthorized { endpoint }
            },
            403 => SoukError::Forbidden { endpoint },
            404 => SoukError::NotFound { endpoint },
            429 => SoukError::RateLimited {
                endpoint,
                retry_after_seconds: parse_retry_after(retry_after),
            },
            500..=599 => SoukError::ServiceUnavailable { endpoint, status },
            _ => SoukError::ClientError {
                endpoint,
                status,
                message: error_message(status, body),
            },
        }
    }

    /// Classify a failure of the HTTP primitive itself
    pub fn classify_transport(&self, endpoint: &str, error: reqwest::Error) -> SoukError {
        if error.is_decode() {
            return SoukError::Parse {
                endpoint: endpoint.to_string(),
                message: error.to_string(),
            };
        }

        let message = if error.is_timeout() {
            format!("Request to {} timed out", endpoint)
        } else if error.is_connect() {
            format!("Could not connect while requesting {}", endpoint)
        } else {
            format!("Request to {} failed", endpoint)
        };
        SoukError::network(message, error)
    }
}

/// Seconds to wait from a `Retry-After` header value
pub fn parse_retry_after(value: Option<&str>) -> u64 {
    value
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Human-readable message for a rejected request.
///
/// Prefers a `message` or `error` string in a JSON error body.
fn error_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in ["message", "error"] {
            if let Some(Value::String(message)) = map.get(field) {
                return message.clone();
            }
        }
    }

    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Request rejected")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;

    fn classifier() -> (ErrorClassifier, Arc<MemorySessionStore>) {
        let session = Arc::new(MemorySessionStore::new());
        (ErrorClassifier::new(session.clone()), session)
    }

    #[test]
    fn test_status_mapping() {
        let (classifier, _) = classifier();

        assert!(matches!(classifier.classify_status(403, None, "/admin", ""), SoukError::Forbidden { .. }));
        assert!(matches!(classifier.classify_status(404, None, "/listings/9", ""), SoukError::NotFound { .. }));
        assert!(matches!(
            classifier.classify_status(503, None, "/search", ""),
            SoukError::ServiceUnavailable { status: 503, .. }
        ));
        assert!(matches!(
            classifier.classify_status(500, None, "/search", ""),
            SoukError::ServiceUnavailable { status: 500, .. }
        ));
        assert!(matches!(
            classifier.classify_status(422, None, "/orders", ""),
            SoukError::ClientError { status: 422, .. }
        ));
    }

    #[test]
    fn test_retryability_follows_classification() {
        let (classifier, _) = classifier();

        assert!(classifier.classify_status(502, None, "/x", "").is_retryable());
        assert!(!classifier.classify_status(400, None, "/x", "").is_retryable());
        assert!(!classifier.classify_status(401, None, "/x", "").is_retryable());
        assert!(!classifier.classify_status(429, Some("5"), "/x", "").is_retryable());
    }

    #[test]
    fn test_unauthorized_clears_session() {
        let (classifier, session) = classifier();
        session.set(SESSION_KEY, "token".to_string());
        session.set("theme", "dark".to_string());

        let err = classifier.classify_status(401, None, "/me", "");
        assert!(matches!(err, SoukError::Unauthorized { .. }));
        assert!(session.get(SESSION_KEY).is_none());
        assert_eq!(session.get("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_rate_limit_retry_after() {
        let (classifier, _) = classifier();

        match classifier.classify_status(429, Some("60"), "/search", "") {
            SoukError::RateLimited { retry_after_seconds, .. } => assert_eq!(retry_after_seconds, 60),
            other => panic!("Expected RateLimited, got {:?}", other),
        }

        assert_eq!(parse_retry_after(Some(" 15 ")), 15);
        assert_eq!(parse_retry_after(Some("Wed, 21 Oct 2015 07:28:00 GMT")), DEFAULT_RETRY_AFTER_SECS);
        assert_eq!(parse_retry_after(None), DEFAULT_RETRY_AFTER_SECS);
    }

    #[test]
    fn test_client_error_message_from_body() {
        let (classifier, _) = classifier();

        let err = classifier.classify_status(400, None, "/listings", r#"{"message":"Price must be positive"}"#);
        assert!(err.to_string().contains("Price must be positive"));

        let err = classifier.classify_status(409, None, "/listings", r#"{"error":"Already sold"}"#);
        assert!(err.to_string().contains("Already sold"));

        let err = classifier.classify_status(400, None, "/listings", "<html>oops</html>");
        assert!(err.to_string().contains("Bad Request"));
    }
}
