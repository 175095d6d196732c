//! Identity accessor

use crate::error::HostError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Authenticated user as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// Avatar image URL
    pub avatar_url: String,
    /// Primary email
    pub email: String,
    /// Numeric account id
    pub id: u64,
    /// Whether the user owns the running app
    pub is_owner: bool,
    /// Account login
    pub login: String,
}

impl UserInfo {
    /// First two characters of the login, uppercased
    #[must_use]
    pub fn initials(&self) -> String {
        self.login.chars().take(2).collect::<String>().to_uppercase()
    }
}

/// Identity service
///
/// Used as `Arc<dyn IdentityService>`. No caching is implied; every call
/// asks the host again.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Currently authenticated user
    async fn user(&self) -> Result<UserInfo, HostError>;
}

/// Identity fixed at construction time
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<UserInfo>,
}

impl StaticIdentity {
    /// Serve `user`
    #[inline]
    #[must_use]
    pub fn new(user: UserInfo) -> Self {
        Self { user: Some(user) }
    }

    /// Reject every lookup
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

impl From<Option<UserInfo>> for StaticIdentity {
    fn from(user: Option<UserInfo>) -> Self {
        Self { user }
    }
}

#[async_trait]
impl IdentityService for StaticIdentity {
    async fn user(&self) -> Result<UserInfo, HostError> {
        self.user.clone().ok_or(HostError::Unauthenticated)
    }
}
