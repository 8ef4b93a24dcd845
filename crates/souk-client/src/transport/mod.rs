//! Single-call HTTP transport with connection pooling

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, Method};
use serde_json::Value;
use souk_core::error::SoukError;
use souk_core::HttpMethod;
use url::Url;

use crate::classify::ErrorClassifier;
use crate::ClientResult;

/// One request as the transport sees it
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Normalized endpoint, relative to the base URL
    pub endpoint: String,
    pub body: Option<Value>,
}

/// Performs exactly one request/response cycle
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the decoded JSON body of a 2xx response,
    /// or the classified error of anything else
    async fn execute(&self, request: &ApiRequest) -> ClientResult<Value>;
}

/// Authentication configuration for API access
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Bearer token for authentication
    pub token: String,
}

/// Settings for the reqwest-backed transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL every endpoint is appended to
    pub base_url: String,
    /// Whole-request timeout
    pub timeout: Duration,
    pub user_agent: String,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
    pub auth: Option<AuthConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("souk/", env!("CARGO_PKG_VERSION")).to_string(),
            pool_max_idle_per_host: 50,
            auth: None,
        }
    }
}

/// Transport over a pooled `reqwest::Client`
#[derive(Clone)]
pub struct HttpTransport {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
    classifier: ErrorClassifier,
}

impl HttpTransport {
    /// Create transport with custom configuration
    pub fn new(config: TransportConfig, classifier: ErrorClassifier) -> ClientResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| {
            SoukError::config("base_url", format!("'{}' is not a valid URL: {}", config.base_url, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        // Configure authentication if provided
        if let Some(auth) = &config.auth {
            let value = HeaderValue::from_str(&format!("Bearer {}", auth.token))
                .map_err(|e| SoukError::config("auth.token", format!("Invalid auth token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            // Request timeout
            .timeout(config.timeout)
            // Enable gzip compression
            .gzip(true)
            .user_agent(config.user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| SoukError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            base_url,
            classifier,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a normalized endpoint
    fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> ClientResult<Value> {
        let endpoint = request.endpoint.as_str();
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), self.url_for(endpoint));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.classifier.classify_transport(endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| self.classifier.classify_transport(endpoint, e))?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes).map_err(|e| SoukError::Parse {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            });
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        Err(self
            .classifier
            .classify_status(status.as_u16(), retry_after.as_deref(), endpoint, &body))
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(base_url: String, auth: Option<AuthConfig>) -> HttpTransport {
        let config = TransportConfig {
            base_url,
            auth,
            ..TransportConfig::default()
        };
        HttpTransport::new(config, ErrorClassifier::new(Arc::new(MemorySessionStore::new()))).unwrap()
    }

    fn get(endpoint: &str) -> ApiRequest {
        ApiRequest {
            method: HttpMethod::Get,
            endpoint: endpoint.to_string(),
            body: None,
        }
    }

    #[test]
    fn test_transport_creation() {
        let t = transport("https://api.souk.test/v1/".to_string(), None);
        assert_eq!(t.base_url(), "https://api.souk.test/v1");
        assert_eq!(t.url_for("/listings?page=2"), "https://api.souk.test/v1/listings?page=2");
    }

    #[test]
    fn test_invalid_base_url() {
        let config = TransportConfig {
            base_url: "not a url".to_string(),
            ..TransportConfig::default()
        };
        let result = HttpTransport::new(config, ErrorClassifier::new(Arc::new(MemorySessionStore::new())));
        assert!(matches!(result, Err(SoukError::Config { .. })));
    }

    #[tokio::test]
    async fn test_get_sends_json_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/listings"))
            .and(query_param("page", "2"))
            .and(header("Accept", "application/json"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let t = transport(
            format!("{}/api", server.uri()),
            Some(AuthConfig { token: "secret".to_string() }),
        );
        let value = t.execute(&get("/listings?page=2")).await.unwrap();
        assert_eq!(value, json!([{"id": 1}]));
    }

    #[tokio::test]
    async fn test_post_serializes_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({"listing": 42})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"order": 9})))
            .mount(&server)
            .await;

        let t = transport(server.uri(), None);
        let request = ApiRequest {
            method: HttpMethod::Post,
            endpoint: "/orders".to_string(),
            body: Some(json!({"listing": 42})),
        };
        assert_eq!(t.execute(&request).await.unwrap(), json!({"order": 9}));
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/listings/3"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let t = transport(server.uri(), None);
        let request = ApiRequest {
            method: HttpMethod::Delete,
            endpoint: "/listings/3".to_string(),
            body: None,
        };
        assert_eq!(t.execute(&request).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let t = transport(server.uri(), None);
        let err = t.execute(&get("/broken")).await.unwrap_err();
        assert!(matches!(err, SoukError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "60"))
            .mount(&server)
            .await;

        let t = transport(server.uri(), None);
        let err = t.execute(&get("/search")).await.unwrap_err();
        assert!(matches!(err, SoukError::RateLimited { retry_after_seconds: 60, .. }));
        assert!(err.to_string().contains("60 seconds"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Nothing listens on the discard port
        let t = transport("http://127.0.0.1:9".to_string(), None);
        let err = t.execute(&get("/listings")).await.unwrap_err();
        assert!(matches!(err, SoukError::Network { .. }));
        assert!(err.is_retryable());
    }
}
