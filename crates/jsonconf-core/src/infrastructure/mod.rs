//! Infrastructure layer: everything that touches the operating system.
//!
//! - **`storage`** – [`storage::FileBackend`], the file primitives the store
//!   reads and writes through, and its local-disk implementation.
//! - **`watch`**   – the polling file watcher and the stale-snapshot flag it
//!   raises.
//!
//! The domain layer never imports from here.

pub mod storage;
pub mod watch;
