//! HTTP request core for Souk services
//!
//! Every business-domain service (messages, notifications, search, settings,
//! shipping, ...) routes its REST calls through an [`ApiClient`]. The client
//! deduplicates concurrent identical requests, caches GET responses per
//! endpoint prefix with stale-while-revalidate, retries transient failures,
//! classifies errors, and can abort requests while they are in flight.

pub mod analytics;
pub mod classify;
pub mod client;
pub mod inflight;
pub mod retry;
pub mod session;
pub mod transport;

// Re-export main types
pub use analytics::{ApiEvent, EventSink, TracingEventSink};
pub use classify::ErrorClassifier;
pub use client::{ApiClient, ApiClientBuilder};
pub use inflight::{AbortHandle, AbortSignal, InFlightRegistry};
pub use retry::RetryController;
pub use session::{MemorySessionStore, SessionStore, SESSION_KEY};
pub use transport::{ApiRequest, AuthConfig, HttpTransport, Transport, TransportConfig};

pub use souk_cache::{CacheStats, KeyStats};
pub use souk_core::{Backoff, CacheConfig, Fingerprint, HttpMethod, RetryConfig};

use souk_core::error::SoukError;

/// Result type for request core operations
pub type ClientResult<T> = Result<T, SoukError>;
