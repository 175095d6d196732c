//! Host bundle
//!
//! Everything a rendering unit may call on the host, passed explicitly
//! instead of living in a global.

use crate::error::HostError;
use crate::identity::{IdentityService, UserInfo};
use crate::llm::LlmService;
use crate::prompt::Prompt;
use spark_kv::{KvError, KvHandle, KvSession, KvValue};
use std::fmt;
use std::sync::Arc;

/// Injected host services
#[derive(Clone)]
pub struct Host {
    llm: Arc<dyn LlmService>,
    identity: Arc<dyn IdentityService>,
    kv: KvSession,
}

impl Host {
    /// Bundle services
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmService>,
        identity: Arc<dyn IdentityService>,
        kv: KvSession,
    ) -> Self {
        Self { llm, identity, kv }
    }

    /// Completion service
    #[inline]
    #[must_use]
    pub fn llm(&self) -> &Arc<dyn LlmService> {
        &self.llm
    }

    /// Identity service
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &Arc<dyn IdentityService> {
        &self.identity
    }

    /// KV session
    #[inline]
    #[must_use]
    pub fn kv(&self) -> &KvSession {
        &self.kv
    }

    /// Shorthand for [`LlmService::complete`]
    ///
    /// # Errors
    /// Whatever the completion service reports.
    pub async fn complete(
        &self,
        prompt: &Prompt,
        model: &str,
        json_mode: bool,
    ) -> Result<String, HostError> {
        self.llm.complete(prompt, model, json_mode).await
    }

    /// Shorthand for [`IdentityService::user`]
    ///
    /// # Errors
    /// Whatever the identity service reports.
    pub async fn user(&self) -> Result<UserInfo, HostError> {
        self.identity.user().await
    }

    /// Shorthand for [`KvSession::use_kv`]
    ///
    /// # Errors
    /// See [`KvSession::use_kv`].
    pub fn use_kv<T: KvValue>(
        &self,
        key: impl Into<String>,
        default: T,
    ) -> Result<KvHandle<T>, KvError> {
        self.kv.use_kv(key, default)
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("kv", &self.kv)
            .finish_non_exhaustive()
    }
}
