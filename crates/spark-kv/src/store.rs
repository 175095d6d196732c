//! Persistent key-value store interface
//!
//! The store is the external system that owns durability. Accessors only
//! ever talk to it through [`KvStore`], so the backend can be swapped for a
//! remote host API, a file on disk, or an in-memory map in tests.

use crate::error::KvError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

/// Asynchronous persistent key-value store
///
/// Used as `Arc<dyn KvStore>`.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Load the value stored under `key`
    ///
    /// Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Value>, KvError>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Value) -> Result<(), KvError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), KvError>;

    /// All keys currently stored, sorted
    async fn keys(&self) -> Result<Vec<String>, KvError>;
}

/// In-memory store backed by a concurrent map
///
/// Nothing survives the process; useful for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store pre-populated with entries
    #[must_use]
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let store = Self::new();
        for (key, value) in entries {
            store.entries.insert(key.into(), value);
        }
        store
    }

    /// Synchronous peek, bypassing the async interface
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Number of stored keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, KvError> {
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), KvError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, KvError> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_set_and_get() {
        let store = MemoryStore::new();
        store.set("a", json!([1, 2, 3])).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(json!([1, 2, 3])));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_delete_is_idempotent() {
        let store = MemoryStore::with_entries([("a", json!(1))]);

        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn memory_store_keys_sorted() {
        let store = MemoryStore::with_entries([("b", json!(1)), ("a", json!(2)), ("c", json!(3))]);

        assert_eq!(store.keys().await.unwrap(), vec!["a", "b", "c"]);
    }
}
