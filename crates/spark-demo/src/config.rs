//! Demo configuration
//!
//! Loaded from a TOML file. Every section and field is optional:
//!
//! ```toml
//! [kv]
//! store_path = "spark-kv.json"
//! hydration_timeout_ms = 5000
//!
//! [llm]
//! endpoint = "https://models.github.ai/inference/chat/completions"
//! model = "gpt-4o-mini"
//! api_key_env = "SPARK_LLM_API_KEY"
//! timeout_secs = 60
//!
//! [user]
//! login = "octocat"
//! email = "octocat@github.com"
//! avatarUrl = "https://github.com/images/error/octocat_happy.gif"
//! id = 583231
//! isOwner = true
//! ```

use crate::error::DemoError;
use serde::{Deserialize, Serialize};
use spark_host::{LlmConfig, UserInfo};
use spark_kv::KvConfig;
use std::path::{Path, PathBuf};

/// Storage section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON document backing the store
    pub store_path: PathBuf,
    /// Accessor tuning
    #[serde(flatten)]
    pub accessor: KvConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("spark-kv.json"),
            accessor: KvConfig::default(),
        }
    }
}

/// Whole demo configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Storage section
    pub kv: StorageConfig,
    /// Completion endpoint
    pub llm: LlmConfig,
    /// Signed-in user; lookups fail when absent
    pub user: Option<UserInfo>,
}

impl AppConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`, falling back to defaults if the file does not exist
    ///
    /// # Errors
    /// `DemoError::Config` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DemoError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::from_toml_str(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no configuration file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(DemoError::Config(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// `DemoError::Config` on malformed TOML or mistyped fields.
    pub fn from_toml_str(text: &str) -> Result<Self, DemoError> {
        toml::from_str(text).map_err(|e| DemoError::Config(e.to_string()))
    }

    /// Render as TOML
    ///
    /// # Errors
    /// `DemoError::Config` if the configuration cannot be serialized.
    pub fn to_toml_string(&self) -> Result<String, DemoError> {
        toml::to_string_pretty(self).map_err(|e| DemoError::Config(e.to_string()))
    }

    /// With store path
    #[inline]
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.kv.store_path = path.into();
        self
    }

    /// With completion endpoint settings
    #[inline]
    #[must_use]
    pub fn with_llm(mut self, llm: LlmConfig) -> Self {
        self.llm = llm;
        self
    }

    /// With signed-in user
    #[inline]
    #[must_use]
    pub fn with_user(mut self, user: UserInfo) -> Self {
        self.user = Some(user);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_gives_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.kv.accessor.hydration_timeout_ms, 5_000);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.user.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [kv]
            hydration_timeout_ms = 250

            [llm]
            model = "gpt-4o"
            "#,
        )
        .unwrap();

        assert_eq!(config.kv.accessor.hydration_timeout_ms, 250);
        assert_eq!(config.kv.store_path, PathBuf::from("spark-kv.json"));
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.timeout_secs, 60);
    }

    #[test]
    fn user_section_uses_host_field_names() {
        let config = AppConfig::from_toml_str(
            r#"
            [user]
            login = "octocat"
            email = "octocat@github.com"
            avatarUrl = "https://example.com/a.png"
            id = 583231
            isOwner = true
            "#,
        )
        .unwrap();

        let user = config.user.unwrap();
        assert_eq!(user.login, "octocat");
        assert!(user.is_owner);
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = AppConfig::from_toml_str("[kv\nstore_path = 1").unwrap_err();
        assert!(matches!(err, DemoError::Config(_)));
    }
}
