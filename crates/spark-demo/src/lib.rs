//! Spark Demo - capability showcase controllers
//!
//! Headless versions of the three showcase panels:
//! - [`NotesBoard`]: persisted notes over the KV accessor
//! - [`Playground`]: free-form LLM prompts
//! - [`UserPanel`]: signed-in user details
//!
//! Feedback goes through a [`Notifier`] as toasts.

#![warn(unreachable_pub)]

pub mod app;
pub mod config;
pub mod error;
pub mod notes;
pub mod playground;
pub mod toast;
pub mod user_panel;

pub use app::{build_host, DemoApp};
pub use config::{AppConfig, StorageConfig};
pub use error::DemoError;
pub use notes::{Note, NotesBoard, NOTES_KEY};
pub use playground::{Playground, PlaygroundState};
pub use toast::{spawn_write_failure_toasts, Notifier, Toast, ToastLevel, Toaster};
pub use user_panel::{UserPanel, UserPanelState, OWNER_NOTICE};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the demo
    pub use crate::{
        AppConfig, DemoApp, DemoError, Note, NotesBoard, Notifier, Playground, Toast, UserPanel,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
