//! In-flight request registry
//!
//! Tracks every network exchange currently executing, keyed by fingerprint.
//! The first caller for a fingerprint starts the exchange; every concurrent
//! caller with the same fingerprint attaches to the same shared outcome.
//!
//! The check-then-insert in [`InFlightRegistry::acquire_or_attach`] runs under
//! the DashMap shard lock for the fingerprint, so two racing callers can never
//! both start an exchange.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use souk_core::error::SoukError;
use souk_core::Fingerprint;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::ClientResult;

/// Outcome of one exchange, observable by any number of callers
pub type SharedResult = Shared<BoxFuture<'static, ClientResult<Arc<Value>>>>;

/// Sending half of an abort signal
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half of an abort signal, observed by the retry controller
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Create a linked handle/signal pair
    pub fn pair() -> (AbortHandle, AbortSignal) {
        let (tx, rx) = watch::channel(false);
        (AbortHandle { tx: Arc::new(tx) }, AbortSignal { rx })
    }

    /// A signal that is never raised
    pub fn never() -> AbortSignal {
        Self::pair().1
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal is raised; pends forever otherwise
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without aborting
                futures::future::pending::<()>().await;
            }
        }
    }
}

/// Result of `acquire_or_attach`
pub struct Acquired {
    /// Whether this call started the exchange
    pub is_new: bool,
    pub result: SharedResult,
}

struct InFlightEntry {
    /// Distinguishes successive exchanges for the same fingerprint
    id: u64,
    result: SharedResult,
    abort: AbortHandle,
}

/// Registry of exchanges currently executing
#[derive(Default)]
pub struct InFlightRegistry {
    entries: DashMap<Fingerprint, InFlightEntry>,
    next_id: AtomicU64,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to the exchange running for `fingerprint`, or start one.
    ///
    /// `start` is only called when no exchange is running. The future it
    /// returns is spawned onto the runtime, so it settles (and releases its
    /// entry) even if every attached caller goes away.
    pub fn acquire_or_attach<F>(self: &Arc<Self>, fingerprint: &Fingerprint, start: F) -> Acquired
    where
        F: FnOnce(AbortSignal) -> BoxFuture<'static, ClientResult<Arc<Value>>>,
    {
        match self.entries.entry(fingerprint.clone()) {
            Entry::Occupied(occupied) => {
                debug!(%fingerprint, "Attaching to in-flight request");
                Acquired {
                    is_new: false,
                    result: occupied.get().result.clone(),
                }
            },
            Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (abort, signal) = AbortSignal::pair();
                let work = start(signal);

                let registry = Arc::clone(self);
                let key = fingerprint.clone();
                let task = tokio::spawn(async move {
                    let outcome = work.await;
                    registry.release(&key, id);
                    outcome
                });

                let label = fingerprint.to_string();
                let result = async move {
                    match task.await {
                        Ok(outcome) => outcome,
                        Err(e) if e.is_cancelled() => Err(SoukError::Cancelled { fingerprint: label }),
                        Err(e) => Err(SoukError::network(format!("Request task for {} failed", label), e)),
                    }
                }
                .boxed()
                .shared();

                vacant.insert(InFlightEntry {
                    id,
                    result: result.clone(),
                    abort,
                });

                Acquired {
                    is_new: true,
                    result,
                }
            },
        }
    }

    /// Drop the entry for `fingerprint` if it still belongs to exchange `id`
    fn release(&self, fingerprint: &Fingerprint, id: u64) {
        self.entries.remove_if(fingerprint, |_, entry| entry.id == id);
    }

    /// Fingerprints of every exchange in flight
    pub fn list_active(&self) -> Vec<Fingerprint> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Abort one exchange; every attached caller receives `Cancelled`
    pub fn abort(&self, fingerprint: &Fingerprint) -> bool {
        match self.entries.remove(fingerprint) {
            Some((_, entry)) => {
                info!(%fingerprint, "Aborting request");
                entry.abort.abort();
                true
            },
            None => false,
        }
    }

    /// Abort every exchange whose endpoint starts with `prefix`
    pub fn abort_matching(&self, prefix: &str) -> usize {
        let mut aborted = 0;
        self.entries.retain(|fingerprint, entry| {
            if fingerprint.matches_prefix(prefix) {
                entry.abort.abort();
                aborted += 1;
                false
            } else {
                true
            }
        });
        info!(prefix, aborted, "Aborted matching requests");
        aborted
    }

    /// Abort every exchange and empty the registry
    pub fn abort_all(&self) -> usize {
        let mut aborted = 0;
        self.entries.retain(|_, entry| {
            entry.abort.abort();
            aborted += 1;
            false
        });
        info!(aborted, "Aborted all requests");
        aborted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn slow_value(
        calls: Arc<AtomicUsize>,
        value: Value,
    ) -> impl FnOnce(AbortSignal) -> BoxFuture<'static, ClientResult<Arc<Value>>> {
        move |signal| {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::select! {
                    _ = signal.aborted() => Err(SoukError::Cancelled { fingerprint: "test".to_string() }),
                    _ = tokio::time::sleep(Duration::from_millis(100)) => Ok(Arc::new(value)),
                }
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_second_caller_attaches() {
        let registry = Arc::new(InFlightRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let fp = Fingerprint::get("/listings").unwrap();

        let first = registry.acquire_or_attach(&fp, slow_value(calls.clone(), json!(1)));
        let second = registry.acquire_or_attach(&fp, slow_value(calls.clone(), json!(2)));
        assert!(first.is_new);
        assert!(!second.is_new);
        assert_eq!(registry.list_active(), vec![fp.clone()]);

        let (a, b) = tokio::join!(first.result, second.result);
        assert_eq!(*a.unwrap(), json!(1));
        assert_eq!(*b.unwrap(), json!(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_settled_entry_is_released() {
        let registry = Arc::new(InFlightRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let fp = Fingerprint::get("/listings").unwrap();

        let first = registry.acquire_or_attach(&fp, slow_value(calls.clone(), json!(1)));
        first.result.await.unwrap();

        let again = registry.acquire_or_attach(&fp, slow_value(calls.clone(), json!(2)));
        assert!(again.is_new);
        assert_eq!(*again.result.await.unwrap(), json!(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_abort_cancels_attached_callers() {
        let registry = Arc::new(InFlightRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let fp = Fingerprint::get("/messages/1").unwrap();

        let first = registry.acquire_or_attach(&fp, slow_value(calls.clone(), json!(1)));
        let second = registry.acquire_or_attach(&fp, slow_value(calls.clone(), json!(1)));

        assert!(registry.abort(&fp));
        assert!(!registry.abort(&fp));
        assert!(registry.list_active().is_empty());

        assert!(first.result.await.unwrap_err().is_cancelled());
        assert!(second.result.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_abort_matching_and_all() {
        let registry = Arc::new(InFlightRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let threads = Fingerprint::get("/messages/threads").unwrap();
        let unread = Fingerprint::get("/messages/unread").unwrap();
        let alerts = Fingerprint::get("/notifications").unwrap();

        let a = registry.acquire_or_attach(&threads, slow_value(calls.clone(), json!(1)));
        let b = registry.acquire_or_attach(&unread, slow_value(calls.clone(), json!(2)));
        let c = registry.acquire_or_attach(&alerts, slow_value(calls.clone(), json!(3)));

        assert_eq!(registry.abort_matching("/messages"), 2);
        assert_eq!(registry.list_active(), vec![alerts.clone()]);
        assert!(a.result.await.unwrap_err().is_cancelled());
        assert!(b.result.await.unwrap_err().is_cancelled());

        assert_eq!(registry.abort_all(), 1);
        assert!(registry.is_empty());
        assert!(c.result.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_stale_release_keeps_newer_entry() {
        let registry = Arc::new(InFlightRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let fp = Fingerprint::get("/feed").unwrap();

        let first = registry.acquire_or_attach(&fp, slow_value(calls.clone(), json!(1)));
        registry.abort(&fp);
        let second = registry.acquire_or_attach(&fp, slow_value(calls.clone(), json!(2)));
        assert!(second.is_new);

        // The aborted exchange settling must not drop the newer entry
        assert!(first.result.await.is_err());
        assert_eq!(registry.list_active(), vec![fp.clone()]);
        assert_eq!(*second.result.await.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn test_abort_signal() {
        let (handle, signal) = AbortSignal::pair();
        assert!(!signal.is_aborted());
        handle.abort();
        assert!(signal.is_aborted());
        tokio::time::timeout(Duration::from_millis(100), signal.aborted())
            .await
            .unwrap();

        assert!(!AbortSignal::never().is_aborted());
    }
}
