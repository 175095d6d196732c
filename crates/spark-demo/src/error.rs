//! Error types for the demo controllers
//!
//! Every variant is recoverable; controllers surface them as toasts and
//! leave their state as it was before the failed action.

use spark_host::HostError;
use spark_kv::KvError;

/// Demo error type
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// User submitted empty or whitespace-only input
    #[error("{field} must not be empty")]
    EmptyInput {
        /// What was empty
        field: &'static str,
    },

    /// An action is already running
    #[error("another request is still in progress")]
    Busy,

    /// Host service call failed
    #[error("host call failed: {0}")]
    Host(#[from] HostError),

    /// Key-value layer failed
    #[error("storage error: {0}")]
    Kv(#[from] KvError),

    /// JSON-mode answer did not parse
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl DemoError {
    /// Check if the error came from validating user input
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyInput { .. })
    }

    /// Check if retrying the same action could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Busy => true,
            Self::Host(e) => e.is_retryable(),
            Self::Kv(e) => e.is_retryable(),
            Self::EmptyInput { .. } | Self::InvalidJson(_) | Self::Config(_) => false,
        }
    }
}
