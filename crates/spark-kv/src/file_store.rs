//! File-backed store
//!
//! All keys live in one JSON object on disk. Every mutation rewrites the
//! document through a temporary sibling file and a rename, so a crash
//! mid-write leaves the previous document intact.

use crate::error::KvError;
use crate::store::KvStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Store persisting every key into a single JSON document
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Lazily loaded document; `None` until first access
    document: Mutex<Option<BTreeMap<String, Value>>>,
}

impl FileStore {
    /// Create store for `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: Mutex::new(None),
        }
    }

    /// Path of the backing document
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, Value>, KvError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| KvError::Decode {
                key: self.path.display().to_string(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(KvError::Io(e)),
        }
    }

    async fn persist(&self, document: &BTreeMap<String, Value>) -> Result<(), KvError> {
        let bytes = serde_json::to_vec_pretty(document).map_err(|source| KvError::Encode {
            key: self.path.display().to_string(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::trace!(path = %self.path.display(), keys = document.len(), "persisted kv document");
        Ok(())
    }

    /// Run `f` against the loaded document, persisting when it reports a change
    async fn with_document<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, Value>) -> (R, bool),
    ) -> Result<R, KvError> {
        let mut guard = self.document.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let document = guard.get_or_insert_with(BTreeMap::new);

        let (result, changed) = f(document);
        if changed {
            if let Err(e) = self.persist(document).await {
                // Drop the unsaved change; the next access reloads from disk.
                *guard = None;
                return Err(e);
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, KvError> {
        self.with_document(|doc| (doc.get(key).cloned(), false)).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), KvError> {
        self.with_document(|doc| {
            doc.insert(key.to_string(), value);
            ((), true)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.with_document(|doc| ((), doc.remove(key).is_some())).await
    }

    async fn keys(&self) -> Result<Vec<String>, KvError> {
        self.with_document(|doc| (doc.keys().cloned().collect(), false))
            .await
    }
}
