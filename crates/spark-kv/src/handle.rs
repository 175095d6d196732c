//! Handles and subscriptions handed to rendering units

use crate::error::KvError;
use crate::slot::{KvValue, Phase, Slot};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Stateful value bound to a persistent key
///
/// Cloning is cheap; every clone (and every handle obtained from the same
/// session for the same key) shares one local value.
pub struct KvHandle<T: KvValue> {
    slot: Arc<Slot<T>>,
}

impl<T: KvValue> KvHandle<T> {
    pub(crate) fn new(slot: Arc<Slot<T>>) -> Self {
        Self { slot }
    }

    /// Key this handle is bound to
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        self.slot.key()
    }

    /// Current local value
    #[inline]
    #[must_use]
    pub fn get(&self) -> Arc<T> {
        self.slot.current()
    }

    /// Apply a pure transformation to the latest value
    ///
    /// The local value changes before this returns and subscribers are
    /// notified; the store write is queued. While the key is still hydrating
    /// the transformation is also replayed onto the fetched value, so `f`
    /// may run more than once.
    ///
    /// `f` must not call back into a handle for the same key.
    ///
    /// # Errors
    /// `KvError::Encode` if the new value cannot be serialized; the local
    /// value is left untouched in that case.
    pub fn update<F>(&self, f: F) -> Result<Arc<T>, KvError>
    where
        F: Fn(&T) -> T + Send + Sync + 'static,
    {
        self.slot.update(Arc::new(f))
    }

    /// Replace the value outright
    ///
    /// # Errors
    /// See [`KvHandle::update`].
    pub fn set(&self, value: T) -> Result<Arc<T>, KvError>
    where
        T: Clone,
    {
        self.update(move |_| value.clone())
    }

    /// Reset to the default and remove the key from the store
    pub fn delete(&self) -> Arc<T> {
        self.slot.reset()
    }

    /// Observe every change to this key
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            key: self.key().to_string(),
            rx: self.slot.subscribe_value(),
        }
    }

    /// Hydration state
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.slot.phase()
    }

    /// Check if the initial fetch has settled
    #[inline]
    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.phase() == Phase::Live
    }

    /// Wait for the initial fetch to settle (success, miss, failure or timeout)
    pub async fn hydrated(&self) -> Arc<T> {
        self.slot.wait_live().await;
        self.get()
    }

    /// Re-read the store and adopt its value
    ///
    /// Pending writes for this key are flushed first. A missing key resolves
    /// to the default.
    /// If the value is changed locally while the read is in flight, the
    /// local value is kept and returned.
    ///
    /// # Errors
    /// Store failures, timeouts, or a stored value of the wrong shape.
    pub async fn resync(&self) -> Result<Arc<T>, KvError> {
        self.slot.resync().await
    }

    /// Wait until hydration settled and every queued write was attempted
    pub async fn flush(&self) {
        self.slot.wait_live().await;
        let _ = self.slot.flush_writes().await;
    }
}

impl<T: KvValue> Clone for KvHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: KvValue> fmt::Debug for KvHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvHandle")
            .field("key", &self.key())
            .field("phase", &self.phase())
            .finish()
    }
}

/// Change feed for one key
pub struct Subscription<T> {
    key: String,
    rx: watch::Receiver<Arc<T>>,
}

impl<T> Subscription<T> {
    /// Key being observed
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Latest value, without marking it seen
    #[must_use]
    pub fn current(&self) -> Arc<T> {
        self.rx.borrow().clone()
    }

    /// Check if a value arrived since the last [`Subscription::changed`]
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next change and return the new value
    ///
    /// Several quick changes may be observed as one.
    ///
    /// # Errors
    /// `KvError::Closed` once the slot is gone, which happens only after
    /// [`KvSession::prune`](crate::KvSession::prune) dropped it and no handle remains.
    pub async fn changed(&mut self) -> Result<Arc<T>, KvError> {
        self.rx
            .changed()
            .await
            .map_err(|_| KvError::Closed(self.key.clone()))?;
        Ok(self.rx.borrow_and_update().clone())
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
