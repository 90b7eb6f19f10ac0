//! Behavioural flags for a [`ConfigStore`](crate::ConfigStore).
//!
//! `StoreOptions` is fixed when the store is opened.  It is a plain serde
//! struct so that a host application can keep it in its own settings file:
//!
//! ```toml
//! pretty_print = false
//! atomic_writes = true
//! create_if_non_existent = true
//! watch = true
//! watch_interval_ms = 500
//! ```
//!
//! Every field has a serde default, so a partial (or empty) table is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for loading [`StoreOptions`] from TOML.
#[derive(Debug, Error)]
pub enum OptionsError {
    /// The TOML content could not be parsed.
    #[error("failed to parse store options: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Behavioural flags set once per store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreOptions {
    /// Write with two-space indentation instead of compact JSON.
    #[serde(default = "default_true")]
    pub pretty_print: bool,
    /// Write through a temp file and rename, so readers never see a torn file.
    #[serde(default = "default_true")]
    pub atomic_writes: bool,
    /// Write the defaults to disk at open time when the file is missing.
    #[serde(default)]
    pub create_if_non_existent: bool,
    /// Refuse to open a missing file.  Ignored when
    /// `create_if_non_existent` is set.
    #[serde(default)]
    pub fail_if_non_existent: bool,
    /// Default strictness for `set`, `delete` and `append`.
    #[serde(default)]
    pub strict_access: bool,
    /// Accept `//` and `/* */` comments when reading.
    #[serde(default)]
    pub allow_comments: bool,
    /// Cache the document and poll the file for external changes.
    #[serde(default)]
    pub watch: bool,
    /// Poll interval for `watch`, in milliseconds.
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
}

fn default_true() -> bool {
    true
}
fn default_watch_interval_ms() -> u64 {
    250
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            pretty_print: default_true(),
            atomic_writes: default_true(),
            create_if_non_existent: false,
            fail_if_non_existent: false,
            strict_access: false,
            allow_comments: false,
            watch: false,
            watch_interval_ms: default_watch_interval_ms(),
        }
    }
}

impl StoreOptions {
    /// Parses options from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::Parse`] if the TOML is malformed or a field has
    /// the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, OptionsError> {
        Ok(toml::from_str(text)?)
    }

    /// The watcher poll interval, never shorter than 10 ms.
    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms.max(10))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
