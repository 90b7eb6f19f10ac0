//! File-system access for the store.
//!
//! The store never calls `std::fs` directly.  It goes through the
//! [`FileBackend`] trait so tests can substitute a mock and so hosts with
//! unusual storage can plug in their own primitives.
//!
//! [`LocalFileBackend`] is the production implementation.  Its atomic write
//! follows the usual temp-file-then-rename pattern:
//!
//! ```text
//! config.json                       <- target
//! .config.json.<uuid>.tmp           <- written + fsynced first
//! rename(.config.json.<uuid>.tmp, config.json)
//! ```
//!
//! The temp file lives in the same directory as the target, so the rename
//! never crosses a file-system boundary and readers observe either the old
//! or the new file, never a partial one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use uuid::Uuid;

/// Identity of a file's current contents, used to detect external changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: SystemTime,
    pub len: u64,
}

/// The raw file primitives the store is built on.
#[cfg_attr(test, mockall::automock)]
pub trait FileBackend: Send + Sync {
    /// Returns `true` if `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Reads the whole file.  A missing file is an
    /// [`io::ErrorKind::NotFound`] error.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replaces the file contents in place.
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Replaces the file contents so that no reader can observe a partial
    /// write.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Returns the current stamp, or `None` if the file does not exist.
    fn stamp(&self, path: &Path) -> io::Result<Option<FileStamp>>;
}

/// [`FileBackend`] over the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileBackend;

impl LocalFileBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Creates the parent directory of `path` if it does not exist yet.
fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// `.<file name>.<uuid>.tmp` next to `path`.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
}

impl FileBackend for LocalFileBackend {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        ensure_parent(path)?;
        fs::write(path, bytes)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        ensure_parent(path)?;
        let temp_path = temp_path_for(path);

        let result = (|| {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            drop(file);
            fs::rename(&temp_path, path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    fn stamp(&self, path: &Path) -> io::Result<Option<FileStamp>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(FileStamp {
                modified: meta.modified()?,
                len: meta.len(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
