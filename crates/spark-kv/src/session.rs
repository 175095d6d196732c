//! Session registry binding keys to shared slots
//!
//! A session plays the role of the page lifetime: the first `use_kv` for a
//! key creates its slot and starts hydration, later calls reuse it.

use crate::error::KvError;
use crate::handle::KvHandle;
use crate::slot::{ErasedSlot, KvValue, Phase, Slot};
use crate::store::KvStore;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Accessor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KvConfig {
    /// Upper bound on the initial fetch of a key, in milliseconds
    pub hydration_timeout_ms: u64,
    /// Buffered write failures per receiver before old ones are dropped
    pub failure_buffer: usize,
}

impl KvConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With hydration timeout
    #[inline]
    #[must_use]
    pub fn with_hydration_timeout(mut self, timeout: Duration) -> Self {
        self.hydration_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Hydration timeout as a duration
    #[inline]
    #[must_use]
    pub fn hydration_timeout(&self) -> Duration {
        Duration::from_millis(self.hydration_timeout_ms)
    }
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            hydration_timeout_ms: 5_000,
            failure_buffer: 64,
        }
    }
}

/// A persistence write that did not reach the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    /// Key whose write failed
    pub key: String,
    /// Rendered store error
    pub error: String,
}

/// Registry of live keys over one store
#[derive(Clone)]
pub struct KvSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Arc<dyn KvStore>,
    config: KvConfig,
    slots: DashMap<String, Arc<dyn ErasedSlot>>,
    failures: broadcast::Sender<WriteFailure>,
}

impl KvSession {
    /// Create session with default configuration
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_config(store, KvConfig::default())
    }

    /// Create session with explicit configuration
    #[must_use]
    pub fn with_config(store: Arc<dyn KvStore>, config: KvConfig) -> Self {
        let (failures, _) = broadcast::channel(config.failure_buffer.max(1));
        Self {
            inner: Arc::new(SessionInner {
                store,
                config,
                slots: DashMap::new(),
                failures,
            }),
        }
    }

    /// Bind to `key`, starting hydration on first use
    ///
    /// `default` is the value until the fetch resolves, and the value when
    /// the store has nothing under `key`. It is ignored if the key is
    /// already live in this session.
    ///
    /// # Errors
    /// - `KvError::InvalidKey` for an empty key
    /// - `KvError::TypeMismatch` if the key is already bound to another type
    ///
    /// # Panics
    /// When called outside a tokio runtime on first use of a key.
    pub fn use_kv<T: KvValue>(
        &self,
        key: impl Into<String>,
        default: T,
    ) -> Result<KvHandle<T>, KvError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(KvError::InvalidKey(key));
        }

        match self.inner.slots.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let erased = Arc::clone(entry.get());
                drop(entry);
                let slot = erased
                    .into_any()
                    .downcast::<Slot<T>>()
                    .map_err(|_| KvError::TypeMismatch {
                        key,
                        requested: std::any::type_name::<T>(),
                    })?;
                Ok(KvHandle::new(slot))
            }
            Entry::Vacant(entry) => {
                let slot = Slot::new(
                    key,
                    default,
                    Arc::clone(&self.inner.store),
                    self.inner.config.hydration_timeout(),
                    self.inner.failures.clone(),
                );
                entry.insert(Arc::clone(&slot) as Arc<dyn ErasedSlot>);
                slot.hydrate();
                tracing::debug!(key = %slot.key(), "bound new key");
                Ok(KvHandle::new(slot))
            }
        }
    }

    /// Receive background write failures from now on
    #[must_use]
    pub fn write_failures(&self) -> broadcast::Receiver<WriteFailure> {
        self.inner.failures.subscribe()
    }

    /// Wait until every bound key has hydrated and drained its writes
    pub async fn flush(&self) {
        let slots: Vec<Arc<dyn ErasedSlot>> = self
            .inner
            .slots
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        futures::future::join_all(slots.into_iter().map(|slot| slot.settle())).await;
    }

    /// Drop slots no handle refers to anymore
    ///
    /// Queued writes of dropped slots still reach the store. Returns the
    /// number of slots removed.
    pub fn prune(&self) -> usize {
        let before = self.inner.slots.len();
        self.inner
            .slots
            .retain(|_, slot| Arc::strong_count(slot) > 1 || slot.phase() != Phase::Live);
        before - self.inner.slots.len()
    }

    /// Keys bound in this session, sorted
    #[must_use]
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .slots
            .iter()
            .map(|entry| entry.value().key().to_string())
            .collect();
        keys.sort();
        keys
    }

    /// Keys present in the backing store
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn stored_keys(&self) -> Result<Vec<String>, KvError> {
        self.inner.store.keys().await
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.inner.store
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &KvConfig {
        &self.inner.config
    }
}

impl fmt::Debug for KvSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvSession")
            .field("config", &self.inner.config)
            .field("active_keys", &self.inner.slots.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn session() -> (Arc<MemoryStore>, KvSession) {
        let store = Arc::new(MemoryStore::new());
        let session = KvSession::new(store.clone());
        (store, session)
    }

    #[test]
    fn kv_config_defaults() {
        let config = KvConfig::new();
        assert_eq!(config.hydration_timeout(), Duration::from_secs(5));

        let config = config.with_hydration_timeout(Duration::from_millis(250));
        assert_eq!(config.hydration_timeout_ms, 250);
    }

    #[tokio::test]
    async fn use_kv_rejects_empty_key() {
        let (_, session) = session();
        assert!(matches!(
            session.use_kv("  ", 0u32),
            Err(KvError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn use_kv_rejects_type_mismatch() {
        let (_, session) = session();
        let _counter = session.use_kv("counter", 0u32).unwrap();

        let clash = session.use_kv("counter", String::new());
        assert!(matches!(clash, Err(KvError::TypeMismatch { .. })));
    }

    #[tokio::test]
    async fn same_key_shares_slot() {
        let (_, session) = session();
        let a = session.use_kv("counter", 0u32).unwrap();
        a.hydrated().await;
        let b = session.use_kv("counter", 100u32).unwrap();

        a.update(|n| n + 1).unwrap();
        assert_eq!(*b.get(), 1);
        assert_eq!(session.active_keys(), vec!["counter"]);
    }

    #[tokio::test]
    async fn flush_drains_writes() {
        let (store, session) = session();
        let handle = session.use_kv("counter", 0u32).unwrap();
        handle.hydrated().await;
        handle.set(7).unwrap();

        session.flush().await;
        assert_eq!(store.peek("counter"), Some(json!(7)));
    }

    #[tokio::test]
    async fn prune_drops_unreferenced_slots() {
        let (store, session) = session();
        {
            let handle = session.use_kv("gone", 0u32).unwrap();
            handle.hydrated().await;
            handle.set(3).unwrap();
        }
        let kept = session.use_kv("kept", 0u32).unwrap();
        kept.hydrated().await;

        session.flush().await;
        assert_eq!(session.prune(), 1);
        assert_eq!(session.active_keys(), vec!["kept"]);
        assert_eq!(store.peek("gone"), Some(json!(3)));
    }
}
