//! Error types for the KV layer
//!
//! Covers:
//! - Backend failures (I/O, remote store)
//! - Value encoding/decoding
//! - Accessor misuse (bad keys, type clashes)
//! - Hydration timeouts

/// Errors raised by stores, accessors and sessions
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// Key is empty or otherwise unusable
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// Key is already bound to a different value type in this session
    #[error("key {key:?} is bound to a different value type (requested {requested})")]
    TypeMismatch {
        /// The contested key
        key: String,
        /// Type name the caller asked for
        requested: &'static str,
    },

    /// Backing store rejected or failed the operation
    #[error("store error: {0}")]
    Store(String),

    /// Value could not be serialized
    #[error("failed to encode value for {key:?}: {source}")]
    Encode {
        /// Key being written
        key: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// Stored value does not match the requested type
    #[error("failed to decode value for {key:?}: {source}")]
    Decode {
        /// Key being read
        key: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem error from a file-backed store
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Store did not answer within the configured bound
    #[error("fetch of {key:?} timed out after {timeout_ms}ms")]
    Timeout {
        /// Key being fetched
        key: String,
        /// Configured bound
        timeout_ms: u64,
    },

    /// Slot was dropped while a subscriber was waiting
    #[error("slot for {0:?} is closed")]
    Closed(String),
}

impl KvError {
    /// Check if retrying the same operation could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Io(_) | Self::Timeout { .. })
    }
}
