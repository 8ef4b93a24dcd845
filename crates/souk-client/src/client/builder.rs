//! Builder for [`ApiClient`]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use souk_cache::{CacheConfigMap, ResponseCache};
use souk_core::error::SoukError;
use souk_core::{CacheConfig, RetryConfig};

use super::{ApiClient, ClientInner};
use crate::analytics::{EventSink, TracingEventSink};
use crate::classify::ErrorClassifier;
use crate::inflight::InFlightRegistry;
use crate::retry::RetryController;
use crate::session::{MemorySessionStore, SessionStore};
use crate::transport::{AuthConfig, HttpTransport, Transport, TransportConfig};
use crate::ClientResult;

/// Exchanges at least this long are reported as slow calls
pub const DEFAULT_SLOW_CALL_THRESHOLD: Duration = Duration::from_millis(2000);

/// Configures and creates an [`ApiClient`]
pub struct ApiClientBuilder {
    transport_config: TransportConfig,
    retry_config: RetryConfig,
    cache_configs: Vec<(String, CacheConfig)>,
    slow_call_threshold: Duration,
    max_cache_entries: Option<usize>,
    session: Option<Arc<dyn SessionStore>>,
    events: Option<Arc<dyn EventSink>>,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self {
            transport_config: TransportConfig::default(),
            retry_config: RetryConfig::default(),
            cache_configs: Vec::new(),
            slow_call_threshold: DEFAULT_SLOW_CALL_THRESHOLD,
            max_cache_entries: None,
            session: None,
            events: None,
            transport: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.transport_config.base_url = base_url.into();
        self
    }

    /// Whole-request timeout for a single attempt
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport_config.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.transport_config.user_agent = user_agent.into();
        self
    }

    pub fn pool_max_idle_per_host(mut self, max_idle: usize) -> Self {
        self.transport_config.pool_max_idle_per_host = max_idle;
        self
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.transport_config.auth = Some(AuthConfig { token: token.into() });
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Make endpoints under `prefix` cacheable from the start
    pub fn cache_for(mut self, prefix: impl Into<String>, config: CacheConfig) -> Self {
        self.cache_configs.push((prefix.into(), config));
        self
    }

    pub fn slow_call_threshold(mut self, threshold: Duration) -> Self {
        self.slow_call_threshold = threshold;
        self
    }

    /// Cap the number of cached responses; the oldest entry is evicted first
    pub fn max_cache_entries(mut self, max_entries: usize) -> Self {
        self.max_cache_entries = Some(max_entries);
        self
    }

    /// Session storage cleared on 401. Defaults to an in-memory store.
    ///
    /// The store is handed to the built-in HTTP transport's classifier, so it
    /// cannot be combined with [`ApiClientBuilder::transport`]; `build` rejects
    /// that combination.
    pub fn session_store(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Analytics sink. Defaults to [`TracingEventSink`].
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Replace the reqwest transport. A custom transport classifies its own
    /// errors, including clearing any session on 401.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> ClientResult<ApiClient> {
        let base_url = self.transport_config.base_url.trim_end_matches('/').to_string();

        let transport: Arc<dyn Transport> = match self.transport {
            Some(_) if self.session.is_some() => {
                return Err(SoukError::config(
                    "session_store",
                    "A session store only applies to the built-in HTTP transport",
                ));
            },
            Some(transport) => transport,
            None => {
                let session = self
                    .session
                    .unwrap_or_else(|| Arc::new(MemorySessionStore::new()) as Arc<dyn SessionStore>);
                Arc::new(HttpTransport::new(self.transport_config, ErrorClassifier::new(session))?)
            },
        };

        let cache = match self.max_cache_entries {
            Some(max_entries) => ResponseCache::with_max_entries(max_entries),
            None => ResponseCache::new(),
        };
        let cache_configs = CacheConfigMap::new();
        cache_configs.configure_many(self.cache_configs);

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                retry: RetryController::new(transport),
                retry_config: RwLock::new(self.retry_config),
                cache,
                cache_configs,
                in_flight: Arc::new(InFlightRegistry::new()),
                events: self
                    .events
                    .unwrap_or_else(|| Arc::new(TracingEventSink) as Arc<dyn EventSink>),
                slow_call_threshold: self.slow_call_threshold,
                base_url,
            }),
        })
    }
}
