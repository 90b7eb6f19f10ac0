//! Domain layer: pure document logic with no file-system access.
//!
//! Everything here operates on in-memory `serde_json` values and can be
//! tested without touching the disk.
//!
//! - **`path`**     – [`path::KeyPath`], the parsed form of a dotted path.
//! - **`resolver`** – read-only and normalizing walks over nested values.
//! - **`document`** – terminal edits (assign / remove / append) and default
//!   merging.
//! - **`codec`**    – the on-disk text format.
//! - **`options`**  – per-store behavioural flags.

pub mod codec;
pub mod document;
pub mod options;
pub mod path;
pub mod resolver;
