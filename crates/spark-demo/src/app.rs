//! Demo application wiring

use crate::config::AppConfig;
use crate::error::DemoError;
use crate::notes::NotesBoard;
use crate::playground::Playground;
use crate::toast::{spawn_write_failure_toasts, Notifier, Toaster};
use crate::user_panel::UserPanel;
use spark_host::{Host, HttpLlm, StaticIdentity};
use spark_kv::{FileStore, KvSession};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Build the production host described by `config`
///
/// # Errors
/// `DemoError::Host` if the HTTP client cannot be built.
pub fn build_host(config: &AppConfig) -> Result<Host, DemoError> {
    let store = Arc::new(FileStore::new(&config.kv.store_path));
    let kv = KvSession::with_config(store, config.kv.accessor);
    let llm = Arc::new(HttpLlm::new(&config.llm)?);
    let identity = Arc::new(StaticIdentity::from(config.user.clone()));

    tracing::info!(
        store = %config.kv.store_path.display(),
        endpoint = %config.llm.endpoint,
        "host ready"
    );
    Ok(Host::new(llm, identity, kv))
}

/// The three showcase controllers over one host
///
/// Must be created inside a Tokio runtime.
pub struct DemoApp {
    host: Host,
    toaster: Arc<Toaster>,
    notes: NotesBoard,
    playground: Playground,
    user_panel: UserPanel,
    failure_toasts: JoinHandle<()>,
}

impl DemoApp {
    /// Build host and controllers from `config`
    ///
    /// # Errors
    /// See [`build_host`] and [`NotesBoard::new`].
    pub fn new(config: &AppConfig) -> Result<Self, DemoError> {
        let host = build_host(config)?;
        Self::with_host(host, &config.llm.model)
    }

    /// Wire controllers over an existing host
    ///
    /// # Errors
    /// See [`NotesBoard::new`].
    pub fn with_host(host: Host, model: &str) -> Result<Self, DemoError> {
        let toaster = Arc::new(Toaster::new());
        let notifier: Arc<dyn Notifier> = toaster.clone();

        let notes = NotesBoard::new(&host, Arc::clone(&notifier))?;
        let playground = Playground::new(host.clone(), Arc::clone(&notifier), model);
        let user_panel = UserPanel::new(host.clone());
        let failure_toasts = spawn_write_failure_toasts(host.kv(), notifier);

        Ok(Self {
            host,
            toaster,
            notes,
            playground,
            user_panel,
            failure_toasts,
        })
    }

    /// Host services
    #[inline]
    #[must_use]
    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Toasts shown so far
    #[inline]
    #[must_use]
    pub fn toaster(&self) -> &Arc<Toaster> {
        &self.toaster
    }

    /// Notes controller
    #[inline]
    #[must_use]
    pub fn notes(&self) -> &NotesBoard {
        &self.notes
    }

    /// Playground controller
    #[inline]
    #[must_use]
    pub fn playground(&self) -> &Playground {
        &self.playground
    }

    /// User panel controller
    #[inline]
    #[must_use]
    pub fn user_panel(&self) -> &UserPanel {
        &self.user_panel
    }

    /// Wait for pending writes, then stop background tasks
    pub async fn shutdown(self) {
        self.host.kv().flush().await;
        // let queued failure toasts land before stopping the listener
        tokio::task::yield_now().await;
        self.failure_toasts.abort();
        tracing::debug!("demo app shut down");
    }
}

impl std::fmt::Debug for DemoApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoApp")
            .field("host", &self.host)
            .field("notes", &self.notes)
            .field("playground", &self.playground)
            .field("user_panel", &self.user_panel)
            .finish_non_exhaustive()
    }
}
