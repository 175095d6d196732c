//! Spark Host - services the platform provides to an app
//!
//! - Prompt builder and completion call
//! - Identity accessor
//! - [`Host`], the bundle handed to every consumer
//!
//! Nothing here is global: tests and binaries assemble a [`Host`] from
//! whichever implementations they need.

#![warn(unreachable_pub)]

pub mod error;
pub mod host;
pub mod identity;
pub mod llm;
pub mod prompt;

pub use error::HostError;
pub use host::Host;
pub use identity::{IdentityService, StaticIdentity, UserInfo};
pub use llm::{HttpLlm, LlmConfig, LlmService, DEFAULT_MODEL};
pub use prompt::{llm_prompt, Prompt};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
