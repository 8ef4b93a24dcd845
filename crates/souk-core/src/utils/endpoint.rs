//! Endpoint normalization.
//!
//! Two spellings of the same logical endpoint must map to one cache key and
//! one in-flight entry, so paths are collapsed and query parameters sorted.
//! The normalized form is only ever a key; requests go out as the caller
//! wrote them, see [`request_target`].

use url::{form_urlencoded, Url};

use crate::error::{SoukError, SoukResult};

/// Placeholder origin used only to parse relative endpoints
const NORMALIZATION_BASE: &str = "http://souk.invalid/";

/// Normalize an endpoint path relative to the API base URL.
///
/// - a leading `/` is enforced, repeated and trailing slashes are removed
/// - `.` and `..` segments are resolved
/// - query parameters are sorted by name; values of a repeated name keep
///   their order, so `?ids=1&ids=2` and `?ids=2&ids=1` stay distinct
/// - the fragment is dropped
pub fn normalize_endpoint(endpoint: &str) -> SoukResult<String> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(SoukError::InvalidRequest {
            reason: "Endpoint must not be empty".to_string(),
        });
    }

    if Url::parse(trimmed).is_ok() {
        return Err(SoukError::InvalidRequest {
            reason: format!("Endpoint '{}' must be a path relative to the base URL", trimmed),
        });
    }

    let base = Url::parse(NORMALIZATION_BASE)
        .map_err(|e| SoukError::network("Invalid normalization base".to_string(), e))?;
    let rooted = format!("/{}", trimmed.trim_start_matches('/'));
    let url = base.join(&rooted).map_err(|e| SoukError::InvalidRequest {
        reason: format!("Invalid endpoint '{}': {}", trimmed, e),
    })?;

    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
    let mut normalized = format!("/{}", segments.join("/"));

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !pairs.is_empty() {
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();
        normalized.push('?');
        normalized.push_str(&query);
    }

    Ok(normalized)
}

/// The endpoint as it is sent over the wire: rooted at `/`, fragment dropped,
/// path and query otherwise exactly as the caller wrote them
pub fn request_target(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    let without_fragment = match trimmed.split_once('#') {
        Some((target, _)) => target,
        None => trimmed,
    };
    format!("/{}", without_fragment.trim_start_matches('/'))
}
