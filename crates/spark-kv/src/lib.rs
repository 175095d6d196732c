//! Spark KV - reactive key-value accessor
//!
//! Binds local, immediately-readable state to a key in an asynchronous
//! persistent store:
//! - Hydrates on first use, with a bounded fetch
//! - Applies functional updates against the latest value
//! - Writes through in call order, one writer per key
//! - Notifies subscribers on every change
//!
//! # Example
//!
//! ```rust,ignore
//! use spark_kv::{KvSession, MemoryStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), spark_kv::KvError> {
//! let session = KvSession::new(Arc::new(MemoryStore::new()));
//! let todos = session.use_kv("todos", Vec::<String>::new())?;
//!
//! todos.update(|items| {
//!     let mut items = items.clone();
//!     items.push("write docs".to_string());
//!     items
//! })?;
//!
//! assert_eq!(todos.get().len(), 1);
//! session.flush().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod file_store;
pub mod handle;
pub mod session;
pub mod store;

mod slot;

pub use error::KvError;
pub use file_store::FileStore;
pub use handle::{KvHandle, Subscription};
pub use session::{KvConfig, KvSession, WriteFailure};
pub use slot::{KvValue, Phase};
pub use store::{KvStore, MemoryStore};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Spark KV
    pub use crate::{KvConfig, KvError, KvHandle, KvSession, KvStore, Phase, Subscription};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
