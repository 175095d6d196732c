//! Per-key slot: local value, hydration state machine and writer task
//!
//! A slot is shared by every handle bound to the same key in a session.
//! Local state lives in a `watch` channel so subscribers are woken on every
//! change. All mutators serialize on `pending`, which also holds the updates
//! issued while the slot is still hydrating so they can be replayed on top of
//! the fetched value.

use crate::error::KvError;
use crate::session::WriteFailure;
use crate::store::KvStore;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Values that can live in a KV slot
pub trait KvValue: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> KvValue for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Lifecycle of a key within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Slot exists but no fetch has been issued
    Uninitialized,
    /// Initial fetch in flight; value is the default plus local updates
    Hydrating,
    /// Local value is authoritative; updates write through
    Live,
}

pub(crate) type Updater<T> = Arc<dyn Fn(&T) -> T + Send + Sync>;

enum PendingOp<T> {
    Update(Updater<T>),
    Reset,
}

#[derive(Debug)]
enum WriteOp {
    Set(Value),
    Delete,
}

#[derive(Debug)]
enum WriteCmd {
    Write(WriteOp),
    Flush(oneshot::Sender<()>),
}

enum Fetched {
    Found(Value),
    Missing,
    Failed(KvError),
}

pub(crate) struct Slot<T> {
    key: String,
    default: Arc<T>,
    value: watch::Sender<Arc<T>>,
    phase: watch::Sender<Phase>,
    pending: Mutex<Vec<PendingOp<T>>>,
    /// Bumped on every local mutation, under `pending`
    revision: AtomicU64,
    writes: mpsc::UnboundedSender<WriteCmd>,
    store: Arc<dyn KvStore>,
    timeout: Duration,
}

impl<T: KvValue> Slot<T> {
    /// Create slot and spawn its writer task
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn new(
        key: String,
        default: T,
        store: Arc<dyn KvStore>,
        timeout: Duration,
        failures: broadcast::Sender<WriteFailure>,
    ) -> Arc<Self> {
        let default = Arc::new(default);
        let (value, _) = watch::channel(Arc::clone(&default));
        let (phase, _) = watch::channel(Phase::Uninitialized);
        let (writes, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_writer(key.clone(), Arc::clone(&store), rx, failures));

        Arc::new(Self {
            key,
            default,
            value,
            phase,
            pending: Mutex::new(Vec::new()),
            revision: AtomicU64::new(0),
            writes,
            store,
            timeout,
        })
    }

    #[inline]
    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub(crate) fn current(&self) -> Arc<T> {
        self.value.borrow().clone()
    }

    #[inline]
    pub(crate) fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub(crate) fn subscribe_value(&self) -> watch::Receiver<Arc<T>> {
        self.value.subscribe()
    }

    /// Issue the initial fetch
    pub(crate) fn hydrate(self: &Arc<Self>) {
        {
            let _pending = self.pending.lock();
            if self.phase() != Phase::Uninitialized {
                return;
            }
            self.phase.send_replace(Phase::Hydrating);
        }

        let slot = Arc::clone(self);
        tokio::spawn(async move {
            let fetched = slot.fetch().await;
            slot.finish_hydration(fetched);
        });
    }

    /// Wait until the slot is [`Phase::Live`]
    pub(crate) async fn wait_live(&self) {
        let mut rx = self.phase.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|phase| *phase == Phase::Live).await;
    }

    /// Apply `f` to the latest value
    pub(crate) fn update(&self, f: Updater<T>) -> Result<Arc<T>, KvError> {
        let mut pending = self.pending.lock();
        let current = self.current();
        let next = Arc::new(f(&current));

        if self.phase() == Phase::Live {
            let encoded = self.encode(&next)?;
            self.revision.fetch_add(1, Ordering::Relaxed);
            self.value.send_replace(Arc::clone(&next));
            self.send(WriteCmd::Write(WriteOp::Set(encoded)));
        } else {
            self.revision.fetch_add(1, Ordering::Relaxed);
            self.value.send_replace(Arc::clone(&next));
            pending.push(PendingOp::Update(f));
        }

        Ok(next)
    }

    /// Reset to the default and remove the stored value
    pub(crate) fn reset(&self) -> Arc<T> {
        let mut pending = self.pending.lock();
        self.revision.fetch_add(1, Ordering::Relaxed);
        self.value.send_replace(Arc::clone(&self.default));

        if self.phase() == Phase::Live {
            self.send(WriteCmd::Write(WriteOp::Delete));
        } else {
            pending.push(PendingOp::Reset);
        }

        Arc::clone(&self.default)
    }

    /// Acknowledged once every write enqueued before this call was attempted
    pub(crate) fn flush_writes(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.send(WriteCmd::Flush(tx));
        rx
    }

    /// Replace the local value with whatever the store currently holds
    ///
    /// A local mutation made while the fetch is in flight wins: its write is
    /// already queued, so the store will end up holding the local value.
    pub(crate) async fn resync(&self) -> Result<Arc<T>, KvError> {
        self.wait_live().await;
        let started = {
            let _pending = self.pending.lock();
            self.revision.load(Ordering::Relaxed)
        };
        let _ = self.flush_writes().await;

        let decoded = self.decode(self.fetch().await)?;

        let _pending = self.pending.lock();
        if self.revision.load(Ordering::Relaxed) != started {
            tracing::debug!(key = %self.key, "local change during resync, keeping local value");
            return Ok(self.current());
        }
        let value = decoded.map_or_else(|| Arc::clone(&self.default), Arc::new);
        self.value.send_replace(Arc::clone(&value));
        tracing::debug!(key = %self.key, "resynced from store");
        Ok(value)
    }

    async fn fetch(&self) -> Fetched {
        match tokio::time::timeout(self.timeout, self.store.get(&self.key)).await {
            Ok(Ok(Some(value))) => Fetched::Found(value),
            Ok(Ok(None)) => Fetched::Missing,
            Ok(Err(e)) => Fetched::Failed(e),
            Err(_) => Fetched::Failed(KvError::Timeout {
                key: self.key.clone(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    fn finish_hydration(&self, fetched: Fetched) {
        let decoded = self.decode(fetched);

        let mut pending = self.pending.lock();
        if self.phase() != Phase::Hydrating {
            return;
        }
        let ops = std::mem::take(&mut *pending);

        let value = match decoded {
            Ok(stored) => {
                let base = stored.map_or_else(|| Arc::clone(&self.default), Arc::new);
                let value = self.replay(base, &ops);
                self.value.send_replace(Arc::clone(&value));
                tracing::debug!(
                    key = %self.key,
                    replayed = ops.len(),
                    "hydrated"
                );
                value
            }
            Err(e) => {
                // Local value already holds default + ops.
                tracing::warn!(key = %self.key, error = %e, "hydration failed, keeping local value");
                self.current()
            }
        };

        self.phase.send_replace(Phase::Live);

        match ops.last() {
            None => {}
            Some(PendingOp::Reset) => self.send(WriteCmd::Write(WriteOp::Delete)),
            Some(PendingOp::Update(_)) => match self.encode(&value) {
                Ok(encoded) => self.send(WriteCmd::Write(WriteOp::Set(encoded))),
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "dropping write of unencodable value");
                }
            },
        }
    }

    fn replay(&self, base: Arc<T>, ops: &[PendingOp<T>]) -> Arc<T> {
        ops.iter().fold(base, |acc, op| match op {
            PendingOp::Update(f) => Arc::new(f(&acc)),
            PendingOp::Reset => Arc::clone(&self.default),
        })
    }

    fn decode(&self, fetched: Fetched) -> Result<Option<T>, KvError> {
        match fetched {
            Fetched::Found(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| KvError::Decode {
                    key: self.key.clone(),
                    source,
                }),
            Fetched::Missing => Ok(None),
            Fetched::Failed(e) => Err(e),
        }
    }

    fn encode(&self, value: &T) -> Result<Value, KvError> {
        serde_json::to_value(value).map_err(|source| KvError::Encode {
            key: self.key.clone(),
            source,
        })
    }

    fn send(&self, cmd: WriteCmd) {
        if self.writes.send(cmd).is_err() {
            tracing::warn!(key = %self.key, "writer task stopped, write dropped");
        }
    }
}

/// Type-erased view of a slot held by the session registry
pub(crate) trait ErasedSlot: Send + Sync {
    fn key(&self) -> &str;
    fn phase(&self) -> Phase;
    /// Wait for hydration, then for every queued write
    fn settle(self: Arc<Self>) -> BoxFuture<'static, ()>;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: KvValue> ErasedSlot for Slot<T> {
    fn key(&self) -> &str {
        Slot::key(self)
    }

    fn phase(&self) -> Phase {
        Slot::phase(self)
    }

    fn settle(self: Arc<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            self.wait_live().await;
            let _ = self.flush_writes().await;
        })
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Writer loop, one per slot
///
/// Commands queued while a write is in flight are batched; only the latest
/// set/delete of a batch reaches the store. Flush acks are sent after the
/// batch's write completes.
async fn run_writer(
    key: String,
    store: Arc<dyn KvStore>,
    mut rx: mpsc::UnboundedReceiver<WriteCmd>,
    failures: broadcast::Sender<WriteFailure>,
) {
    while let Some(first) = rx.recv().await {
        let mut latest = None;
        let mut acks = Vec::new();
        let mut next = Some(first);

        while let Some(cmd) = next {
            match cmd {
                WriteCmd::Write(op) => latest = Some(op),
                WriteCmd::Flush(ack) => acks.push(ack),
            }
            next = rx.try_recv().ok();
        }

        if let Some(op) = latest {
            let result = match op {
                WriteOp::Set(value) => store.set(&key, value).await,
                WriteOp::Delete => store.delete(&key).await,
            };

            match result {
                Ok(()) => tracing::debug!(key = %key, "persisted"),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "persistence write failed, keeping local value");
                    // No receivers is fine.
                    let _ = failures.send(WriteFailure {
                        key: key.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        for ack in acks {
            let _ = ack.send(());
        }
    }

    tracing::trace!(key = %key, "writer stopped");
}
