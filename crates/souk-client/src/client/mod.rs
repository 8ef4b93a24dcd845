//! Request orchestrator
//!
//! [`ApiClient`] composes the cache, the in-flight registry and the retry
//! controller. One client is created at startup and cloned into every
//! service; clones share all state.

mod builder;

pub use builder::{ApiClientBuilder, DEFAULT_SLOW_CALL_THRESHOLD};

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::FutureExt;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use souk_cache::{CacheConfigMap, CacheStats, Freshness, ResponseCache};
use souk_core::error::SoukError;
use souk_core::{request_target, CacheConfig, Fingerprint, HttpMethod, RetryConfig};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::analytics::{ApiEvent, EventSink};
use crate::inflight::{AbortSignal, Acquired, InFlightRegistry};
use crate::retry::RetryController;
use crate::transport::ApiRequest;
use crate::ClientResult;

/// Shared HTTP request core
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    retry: RetryController,
    retry_config: RwLock<RetryConfig>,
    cache: ResponseCache,
    cache_configs: CacheConfigMap,
    in_flight: Arc<InFlightRegistry>,
    events: Arc<dyn EventSink>,
    slow_call_threshold: Duration,
    base_url: String,
}

impl ApiClient {
    /// Client for `base_url` with default settings
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        Self::builder().base_url(base_url).build()
    }

    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// GET `endpoint` and deserialize the response
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ClientResult<T> {
        let value = self.get_value(endpoint).await?;
        decode(endpoint, &value)
    }

    /// GET `endpoint`, returning the shared JSON value
    pub async fn get_value(&self, endpoint: &str) -> ClientResult<Arc<Value>> {
        self.request_value(HttpMethod::Get, endpoint, None).await
    }

    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.post_value(endpoint, encode(body)?).await?;
        decode(endpoint, &value)
    }

    pub async fn post_value(&self, endpoint: &str, body: Value) -> ClientResult<Arc<Value>> {
        self.request_value(HttpMethod::Post, endpoint, Some(body)).await
    }

    pub async fn put<B, T>(&self, endpoint: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.put_value(endpoint, encode(body)?).await?;
        decode(endpoint, &value)
    }

    pub async fn put_value(&self, endpoint: &str, body: Value) -> ClientResult<Arc<Value>> {
        self.request_value(HttpMethod::Put, endpoint, Some(body)).await
    }

    pub async fn patch<B, T>(&self, endpoint: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.patch_value(endpoint, encode(body)?).await?;
        decode(endpoint, &value)
    }

    pub async fn patch_value(&self, endpoint: &str, body: Value) -> ClientResult<Arc<Value>> {
        self.request_value(HttpMethod::Patch, endpoint, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> ClientResult<T> {
        let value = self.delete_value(endpoint).await?;
        decode(endpoint, &value)
    }

    pub async fn delete_value(&self, endpoint: &str) -> ClientResult<Arc<Value>> {
        self.request_value(HttpMethod::Delete, endpoint, None).await
    }

    /// Issue any request through the cache and dedup path.
    ///
    /// Reads consult the cache first; writes always go through the in-flight
    /// registry and never touch the cache. The fingerprint is computed from
    /// the normalized endpoint, but the request is sent as written.
    pub async fn request_value(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Value>,
    ) -> ClientResult<Arc<Value>> {
        let fingerprint = Fingerprint::new(method, endpoint, body.as_ref())?;
        let target = request_target(endpoint);

        if method.is_read() {
            if let Some(value) = self.read_cached(&fingerprint, &target) {
                return Ok(value);
            }
        }

        let request = ApiRequest {
            method,
            endpoint: target,
            body,
        };
        self.dispatch(fingerprint, request).result.await
    }

    /// Answer from the cache when the endpoint is cacheable and the entry usable
    fn read_cached(&self, fingerprint: &Fingerprint, target: &str) -> Option<Arc<Value>> {
        let key = fingerprint.cache_key();
        self.inner.cache_configs.resolve(key)?;

        if let Some(entry) = self.inner.cache.get(key) {
            match entry.freshness() {
                Freshness::Fresh => {
                    self.record_hit(key, false);
                    return Some(entry.value);
                },
                Freshness::Stale => {
                    self.record_hit(key, true);
                    self.revalidate(fingerprint, target);
                    return Some(entry.value);
                },
                Freshness::Expired => {},
            }
        }

        self.inner.cache.record_miss(key);
        self.inner.events.record(ApiEvent::CacheMiss { key: key.to_string() });
        None
    }

    fn record_hit(&self, key: &str, stale: bool) {
        self.inner.cache.record_hit(key);
        self.inner.events.record(ApiEvent::CacheHit {
            key: key.to_string(),
            stale,
        });
    }

    /// Refresh a stale entry in the background through the dedup path
    fn revalidate(&self, fingerprint: &Fingerprint, target: &str) {
        let request = ApiRequest {
            method: HttpMethod::Get,
            endpoint: target.to_string(),
            body: None,
        };
        let acquired = self.dispatch(fingerprint.clone(), request);
        if !acquired.is_new {
            return;
        }

        debug!(%fingerprint, "Revalidating stale entry");
        let fingerprint = fingerprint.clone();
        tokio::spawn(async move {
            match acquired.result.await {
                Ok(_) => debug!(%fingerprint, "Revalidated stale entry"),
                Err(error) if error.is_cancelled() => debug!(%fingerprint, "Revalidation aborted"),
                Err(error) => warn!(%fingerprint, error = %error, "Background revalidation failed"),
            }
        });
    }

    fn dispatch(&self, fingerprint: Fingerprint, request: ApiRequest) -> Acquired {
        let inner = Arc::clone(&self.inner);
        let key = fingerprint.clone();
        self.inner.in_flight.acquire_or_attach(&key, move |signal| {
            inner.exchange(request, fingerprint, signal).boxed()
        })
    }

    // Cache administration

    /// Make endpoints under `prefix` cacheable
    pub fn configure_cache_for(&self, prefix: impl Into<String>, config: CacheConfig) {
        self.inner.cache_configs.configure(prefix, config);
    }

    /// Stop caching `prefix` and drop the cached entries no longer covered
    /// by any other configured prefix
    pub fn remove_cache_config_for(&self, prefix: &str) -> Option<CacheConfig> {
        let removed = self.inner.cache_configs.remove(prefix);
        let configs = &self.inner.cache_configs;
        let dropped = self
            .inner
            .cache
            .invalidate_where(prefix, |key| configs.resolve(key).is_none());
        info!(prefix, dropped, "Removed cache configuration");
        removed
    }

    /// Change the TTL for `prefix`; an unknown prefix is registered
    pub fn update_cache_ttl(&self, prefix: &str, ttl: Duration) -> CacheConfig {
        let config = self.inner.cache_configs.update_ttl(prefix, ttl);
        info!(prefix, ttl_ms = ttl.as_millis() as u64, "Updated cache TTL");
        config
    }

    pub fn batch_configure_cache<I, K>(&self, configs: I)
    where
        I: IntoIterator<Item = (K, CacheConfig)>,
        K: Into<String>,
    {
        self.inner.cache_configs.configure_many(configs);
    }

    /// Drop every cached entry whose key starts with `prefix`
    pub fn invalidate_cache(&self, prefix: &str) -> usize {
        let removed = self.inner.cache.invalidate(prefix);
        debug!(prefix, removed, "Invalidated cache entries");
        removed
    }

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        info!("Cleared response cache");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Registered cache policies in registration order
    pub fn cache_configurations(&self) -> IndexMap<String, CacheConfig> {
        self.inner.cache_configs.snapshot()
    }

    // Retry administration

    pub fn configure_retry(&self, config: RetryConfig) {
        info!(
            max_retries = config.max_retries,
            retry_delay_ms = config.retry_delay.as_millis() as u64,
            "Configured retry policy"
        );
        *self.inner.retry_config.write() = config;
    }

    pub fn retry_config(&self) -> RetryConfig {
        *self.inner.retry_config.read()
    }

    // Cancellation

    /// Abort one in-flight request; false if it was not running
    pub fn abort_request(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.in_flight.abort(fingerprint)
    }

    /// Abort every in-flight request whose endpoint starts with `prefix`
    pub fn abort_requests_matching(&self, prefix: &str) -> usize {
        self.inner.in_flight.abort_matching(prefix)
    }

    pub fn abort_all_requests(&self) -> usize {
        self.inner.in_flight.abort_all()
    }

    /// Fingerprints of the requests currently in flight
    pub fn active_requests(&self) -> Vec<Fingerprint> {
        self.inner.in_flight.list_active()
    }
}

impl ClientInner {
    /// One network exchange: retries, slow-call reporting and cache write
    async fn exchange(
        self: Arc<Self>,
        request: ApiRequest,
        fingerprint: Fingerprint,
        signal: AbortSignal,
    ) -> ClientResult<Arc<Value>> {
        let span = info_span!("exchange", fingerprint = %fingerprint);
        async move {
            let retry_config = *self.retry_config.read();
            // Invalidations during the exchange make its response unfit to cache
            let generation = self.cache.generation();
            let started = Instant::now();
            let outcome = self
                .retry
                .execute(&request, &retry_config, &signal, &fingerprint)
                .await;

            let duration = started.elapsed();
            if duration >= self.slow_call_threshold {
                self.events.record(ApiEvent::SlowCall {
                    method: request.method,
                    endpoint: request.endpoint.clone(),
                    duration,
                });
            }

            match outcome {
                Ok(value) => {
                    let value = Arc::new(value);
                    if request.method.is_read() {
                        if let Some(config) = self.cache_configs.resolve(fingerprint.cache_key()) {
                            let key = fingerprint.cache_key();
                            if !self.cache.insert_if_current(key, Arc::clone(&value), &config, generation) {
                                debug!(%fingerprint, "Cache invalidated during request, response not cached");
                            }
                        }
                    }
                    Ok(value)
                },
                Err(error) => {
                    if !error.is_cancelled() {
                        self.events.record(ApiEvent::ApiError {
                            method: request.method,
                            endpoint: request.endpoint.clone(),
                            kind: error.kind(),
                            status: error.status(),
                        });
                    }
                    Err(error)
                },
            }
        }
        .instrument(span)
        .await
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("cached_entries", &self.inner.cache.len())
            .field("in_flight", &self.inner.in_flight.len())
            .field("retry_config", &*self.inner.retry_config.read())
            .finish()
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> ClientResult<Value> {
    serde_json::to_value(body).map_err(|e| SoukError::InvalidRequest {
        reason: format!("Request body could not be serialized: {}", e),
    })
}

fn decode<T: DeserializeOwned>(endpoint: &str, value: &Value) -> ClientResult<T> {
    <T as Deserialize>::deserialize(value).map_err(|e| SoukError::Parse {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}
