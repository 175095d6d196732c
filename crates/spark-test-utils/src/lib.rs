//! Testing utilities for the Spark workspace
//!
//! Shared fakes for the store and the host services.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use spark_host::{Host, HostError, IdentityService, LlmService, Prompt, StaticIdentity, UserInfo};
use spark_kv::{KvConfig, KvError, KvSession, KvStore, MemoryStore};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// A store write as observed by [`ControlledStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    Set(String, Value),
    Delete(String),
}

/// Memory store whose reads and writes can be held, failed or inspected
#[derive(Debug)]
pub struct ControlledStore {
    inner: MemoryStore,
    reads_open: watch::Sender<bool>,
    writes_open: watch::Sender<bool>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: Mutex<Vec<StoreWrite>>,
}

impl ControlledStore {
    pub fn new() -> Self {
        Self::with_entries(Vec::<(String, Value)>::new())
    }

    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            inner: MemoryStore::with_entries(entries),
            reads_open: watch::channel(true).0,
            writes_open: watch::channel(true).0,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Block `get` until [`ControlledStore::release_reads`]
    pub fn hold_reads(&self) {
        self.reads_open.send_replace(false);
    }

    pub fn release_reads(&self) {
        self.reads_open.send_replace(true);
    }

    /// Block `set`/`delete` until [`ControlledStore::release_writes`]
    pub fn hold_writes(&self) {
        self.writes_open.send_replace(false);
    }

    pub fn release_writes(&self) {
        self.writes_open.send_replace(true);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Writes that reached the store, in order
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes.lock().clone()
    }

    pub fn peek(&self, key: &str) -> Option<Value> {
        self.inner.peek(key)
    }

    async fn wait_open(gate: &watch::Sender<bool>) {
        let mut rx = gate.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for ControlledStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for ControlledStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, KvError> {
        Self::wait_open(&self.reads_open).await;
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(KvError::Store(format!("read of {key} refused")));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), KvError> {
        Self::wait_open(&self.writes_open).await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KvError::Store(format!("write of {key} refused")));
        }
        self.writes
            .lock()
            .push(StoreWrite::Set(key.to_string(), value.clone()));
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        Self::wait_open(&self.writes_open).await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KvError::Store(format!("delete of {key} refused")));
        }
        self.writes.lock().push(StoreWrite::Delete(key.to_string()));
        self.inner.delete(key).await
    }

    async fn keys(&self) -> Result<Vec<String>, KvError> {
        self.inner.keys().await
    }
}

/// A completion request as observed by [`ScriptedLlm`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmCall {
    pub prompt: String,
    pub model: String,
    pub json_mode: bool,
}

/// Completion service answering from a script, echoing once it runs dry
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<LlmCall>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.script.lock().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.script.lock().push_back(Err(message.into()));
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<LlmCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn complete(
        &self,
        prompt: &Prompt,
        model: &str,
        json_mode: bool,
    ) -> Result<String, HostError> {
        self.calls.lock().push(LlmCall {
            prompt: prompt.as_str().to_string(),
            model: model.to_string(),
            json_mode,
        });

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(HostError::Unavailable(message)),
            None => Ok(format!("echo: {}", prompt.as_str())),
        }
    }
}

pub fn sample_user() -> UserInfo {
    UserInfo {
        avatar_url: "https://avatars.githubusercontent.com/u/583231".to_string(),
        email: "octocat@github.com".to_string(),
        id: 583_231,
        is_owner: true,
        login: "octocat".to_string(),
    }
}

pub fn session_over(store: Arc<dyn KvStore>) -> KvSession {
    KvSession::with_config(
        store,
        KvConfig::new().with_hydration_timeout(Duration::from_millis(200)),
    )
}

/// Host over a memory store, scripted completions and [`sample_user`]
pub fn test_host(llm: Arc<ScriptedLlm>, store: Arc<dyn KvStore>) -> Host {
    let identity: Arc<dyn IdentityService> = Arc::new(StaticIdentity::new(sample_user()));
    Host::new(llm, identity, session_over(store))
}

pub fn default_test_host() -> Host {
    test_host(Arc::new(ScriptedLlm::new()), Arc::new(MemoryStore::new()))
}
