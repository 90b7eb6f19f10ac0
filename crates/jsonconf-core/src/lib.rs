//! jsonconf-core: a JSON config file addressed by dotted key paths.
//!
//! ```no_run
//! use jsonconf_core::{ConfigStore, StoreOptions};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), jsonconf_core::StoreError> {
//! let store = ConfigStore::builder("settings.json")
//!     .defaults(json!({ "server": { "port": 8080 }, "plugins": [] }))
//!     .options(StoreOptions { create_if_non_existent: true, ..StoreOptions::default() })
//!     .open()
//!     .await?;
//!
//! store.set("server.host", "0.0.0.0").await?;
//! store.append("plugins", "auth").await?;
//! let port: Option<u16> = store.get_as("server.port").await?;
//! # let _ = port;
//! # Ok(())
//! # }
//! ```
//!
//! # Layout
//!
//! - **`domain`**         – paths, the resolver, document edits, the file
//!   codec and store options.  Pure and synchronous.
//! - **`infrastructure`** – file access and change detection.
//! - **`application`**    – [`ConfigStore`] itself.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::store::{ConfigStore, Mutation, StoreBuilder, StoreError};
pub use domain::document::Document;
pub use domain::options::{OptionsError, StoreOptions};
pub use domain::path::{KeyPath, Segment};
pub use domain::resolver::{PathError, Strictness, ValueKind, WriteFault};
pub use infrastructure::storage::{FileBackend, FileStamp, LocalFileBackend};
pub use infrastructure::watch::ChangeSignal;
