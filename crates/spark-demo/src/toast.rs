//! Transient, non-blocking notifications

use parking_lot::Mutex;
use spark_kv::KvSession;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Severity of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastLevel {
    /// Action completed
    Success,
    /// Action rejected or failed
    Error,
    /// Background problem, nothing was undone
    Warning,
    /// Neutral information
    Info,
}

impl fmt::Display for ToastLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        };
        f.write_str(label)
    }
}

/// A notification shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Severity
    pub level: ToastLevel,
    /// Text shown
    pub message: String,
}

impl Toast {
    /// Create toast
    #[inline]
    #[must_use]
    pub fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Success toast
    #[inline]
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Success, message)
    }

    /// Error toast
    #[inline]
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Error, message)
    }

    /// Warning toast
    #[inline]
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Warning, message)
    }

    /// Info toast
    #[inline]
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Info, message)
    }
}

impl fmt::Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Sink for toasts
pub trait Notifier: Send + Sync {
    /// Show `toast`; must not block
    fn notify(&self, toast: Toast);
}

/// Notifier that keeps toasts in memory and mirrors them to the log
#[derive(Debug, Default)]
pub struct Toaster {
    toasts: Mutex<Vec<Toast>>,
}

impl Toaster {
    /// Create empty toaster
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toasts shown so far
    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().clone()
    }

    /// Most recent toast
    #[must_use]
    pub fn last(&self) -> Option<Toast> {
        self.toasts.lock().last().cloned()
    }

    /// Take every toast shown so far
    pub fn drain(&self) -> Vec<Toast> {
        std::mem::take(&mut *self.toasts.lock())
    }
}

impl Notifier for Toaster {
    fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Error => tracing::info!(level = %toast.level, "{}", toast.message),
            ToastLevel::Warning => tracing::warn!("{}", toast.message),
            ToastLevel::Success | ToastLevel::Info => {
                tracing::debug!(level = %toast.level, "{}", toast.message);
            }
        }
        self.toasts.lock().push(toast);
    }
}

/// Surface background KV write failures as warning toasts
///
/// The task ends when the session's failure channel closes; abort the
/// returned handle to stop it earlier.
pub fn spawn_write_failure_toasts(session: &KvSession, notifier: Arc<dyn Notifier>) -> JoinHandle<()> {
    let mut failures = session.write_failures();
    tokio::spawn(async move {
        loop {
            match failures.recv().await {
                Ok(failure) => notifier.notify(Toast::warning(format!(
                    "Changes to {} could not be saved",
                    failure.key
                ))),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "write failure notifications dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
