//! User panel

use parking_lot::Mutex;
use spark_host::{Host, UserInfo};

/// Shown to the owner of the running app
pub const OWNER_NOTICE: &str = "As the owner, you have full access to manage this Spark application.";

/// Load state of the panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserPanelState {
    /// Lookup not finished
    Loading,
    /// Lookup succeeded
    Loaded(UserInfo),
    /// Lookup failed; details went to the log
    Failed,
}

/// Authenticated-user controller
pub struct UserPanel {
    host: Host,
    state: Mutex<UserPanelState>,
}

impl UserPanel {
    /// Create panel in the loading state
    #[must_use]
    pub fn new(host: Host) -> Self {
        Self {
            host,
            state: Mutex::new(UserPanelState::Loading),
        }
    }

    /// Ask the host who is signed in
    pub async fn load(&self) -> UserPanelState {
        *self.state.lock() = UserPanelState::Loading;

        let next = match self.host.user().await {
            Ok(user) => {
                tracing::debug!(login = %user.login, "user loaded");
                UserPanelState::Loaded(user)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch user");
                UserPanelState::Failed
            }
        };

        *self.state.lock() = next.clone();
        next
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> UserPanelState {
        self.state.lock().clone()
    }

    /// Loaded user, if any
    #[must_use]
    pub fn user(&self) -> Option<UserInfo> {
        match &*self.state.lock() {
            UserPanelState::Loaded(user) => Some(user.clone()),
            UserPanelState::Loading | UserPanelState::Failed => None,
        }
    }

    /// Avatar fallback text
    #[must_use]
    pub fn initials(&self) -> Option<String> {
        self.user().map(|user| user.initials())
    }

    /// Check if the loaded user owns the app
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.user().is_some_and(|user| user.is_owner)
    }

    /// Owner notice, only for owners
    #[must_use]
    pub fn owner_notice(&self) -> Option<&'static str> {
        self.is_owner().then_some(OWNER_NOTICE)
    }
}

impl std::fmt::Debug for UserPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPanel")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
