//! Request fingerprints.
//!
//! A fingerprint identifies "the same logical call": method, normalized
//! endpoint and, for writes, a digest of the JSON body. It keys both the
//! in-flight registry and, through `cache_key`, the response cache.

use std::fmt;

use serde_json::Value;

use super::endpoint::normalize_endpoint;
use super::hash::json_digest;
use crate::error::SoukResult;
use crate::types::HttpMethod;

/// Key identifying one logical request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    method: HttpMethod,
    endpoint: String,
    body_digest: Option<String>,
}

impl Fingerprint {
    /// Compute the fingerprint of a request.
    ///
    /// The body only contributes for writes; reads are keyed by endpoint alone.
    pub fn new(method: HttpMethod, endpoint: &str, body: Option<&Value>) -> SoukResult<Self> {
        let endpoint = normalize_endpoint(endpoint)?;
        let body_digest = match body {
            Some(body) if !method.is_read() => Some(json_digest(body)),
            _ => None,
        };

        Ok(Self {
            method,
            endpoint,
            body_digest,
        })
    }

    /// Fingerprint of a GET request
    pub fn get(endpoint: &str) -> SoukResult<Self> {
        Self::new(HttpMethod::Get, endpoint, None)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Normalized endpoint, path plus sorted query
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn body_digest(&self) -> Option<&str> {
        self.body_digest.as_deref()
    }

    /// Key under which a read's response is cached
    pub fn cache_key(&self) -> &str {
        &self.endpoint
    }

    /// Whether the URL component starts with `prefix`
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.endpoint.starts_with(prefix)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.endpoint)?;
        if let Some(digest) = &self.body_digest {
            write!(f, "#{}", digest)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equivalent_reads_share_fingerprint() {
        let a = Fingerprint::get("/listings/?sort=price&page=1").unwrap();
        let b = Fingerprint::get("listings?page=1&sort=price").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.cache_key(), "/listings?page=1&sort=price");
        assert_eq!(a.to_string(), "GET /listings?page=1&sort=price");
    }

    #[test]
    fn test_read_ignores_body() {
        let body = json!({"ignored": true});
        let a = Fingerprint::new(HttpMethod::Get, "/me", Some(&body)).unwrap();
        assert!(a.body_digest().is_none());
        assert_eq!(a, Fingerprint::get("/me").unwrap());
    }

    #[test]
    fn test_writes_keyed_by_method_and_body() {
        let body = json!({"listing": 42, "qty": 1});
        let post = Fingerprint::new(HttpMethod::Post, "/orders", Some(&body)).unwrap();
        let same = Fingerprint::new(HttpMethod::Post, "/orders/", Some(&json!({"qty": 1, "listing": 42}))).unwrap();
        let other_body = Fingerprint::new(HttpMethod::Post, "/orders", Some(&json!({"listing": 43, "qty": 1}))).unwrap();
        let put = Fingerprint::new(HttpMethod::Put, "/orders", Some(&body)).unwrap();

        assert_eq!(post, same);
        assert_ne!(post, other_body);
        assert_ne!(post, put);
        assert!(post.to_string().starts_with("POST /orders#"));
    }

    #[test]
    fn test_matches_prefix() {
        let fp = Fingerprint::get("/messages/threads/9").unwrap();
        assert!(fp.matches_prefix("/messages"));
        assert!(fp.matches_prefix("/messages/threads/9"));
        assert!(!fp.matches_prefix("/notifications"));
    }
}
