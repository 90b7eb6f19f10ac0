//! `ConfigStore`: a JSON config file addressed by dotted paths.
//!
//! Every operation is one read-modify-write cycle over the file:
//!
//! ```text
//! lock ──► load (file or cached snapshot, defaults underneath)
//!      ──► resolve / edit a private copy
//!      ──► encode + write (mutations only)
//!      ──► unlock
//! ```
//!
//! # Concurrency
//!
//! One `tokio::sync::Mutex` per store serialises all cycles.  The mutex is
//! fair, so operations complete in the order they were issued.  Async
//! methods take an owned guard and run the cycle on the blocking thread
//! pool; `blocking_*` methods lock directly on the calling thread and must
//! not be called from inside an async context.
//!
//! # Caching
//!
//! Without `watch`, every cycle re-reads the file, so edits made by other
//! processes are always visible.  With `watch`, the last document is cached
//! and only re-read after the [`ChangeSignal`] has been marked, either by the
//! built-in poller or by anything holding [`ConfigStore::change_signal`].
//!
//! # Failure
//!
//! Mutations edit a copy of the document.  If resolution fails, nothing is
//! written and the cached snapshot is left as it was.

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::codec::{self, DecodeError};
use crate::domain::document::{self, merge_defaults, Document};
use crate::domain::options::StoreOptions;
use crate::domain::path::KeyPath;
use crate::domain::resolver::{deep_get_in, PathError, Strictness, ValueKind};
use crate::infrastructure::storage::{FileBackend, LocalFileBackend};
use crate::infrastructure::watch::{ChangeSignal, FileWatcher};

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file exists but does not hold a JSON object.
    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    /// A path could not be resolved for a write.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The file is missing and `fail_if_non_existent` is set.
    #[error("config file {path} does not exist")]
    NotFound { path: PathBuf },

    /// The defaults passed to the builder are not an object.
    #[error("defaults must be an object, got {0}")]
    InvalidDefaults(ValueKind),

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A value could not be converted to JSON.
    #[error("failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A stored value could not be converted to the requested type.
    #[error("value at '{path}' has the wrong shape: {source}")]
    TypeMismatch {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The blocking task running the cycle panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A single write, for use with [`ConfigStore::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Set { path: KeyPath, value: Value },
    Delete { path: KeyPath },
    Append { path: KeyPath, value: Value },
}

impl Mutation {
    pub fn set(path: impl Into<KeyPath>, value: Value) -> Self {
        Mutation::Set {
            path: path.into(),
            value,
        }
    }

    pub fn delete(path: impl Into<KeyPath>) -> Self {
        Mutation::Delete { path: path.into() }
    }

    pub fn append(path: impl Into<KeyPath>, value: Value) -> Self {
        Mutation::Append {
            path: path.into(),
            value,
        }
    }

    /// The path this mutation targets.
    pub fn path(&self) -> &KeyPath {
        match self {
            Mutation::Set { path, .. }
            | Mutation::Delete { path }
            | Mutation::Append { path, .. } => path,
        }
    }

    /// Applies the mutation to an in-memory document.
    ///
    /// # Errors
    ///
    /// Propagates the [`PathError`] from the underlying document edit.
    pub fn apply_to(
        self,
        document: &mut Document,
        strictness: Strictness,
    ) -> Result<(), PathError> {
        match self {
            Mutation::Set { path, value } => {
                document::assign(document, &path, value, strictness)
            }
            Mutation::Delete { path } => document::remove(document, &path, strictness),
            Mutation::Append { path, value } => {
                document::append(document, &path, value, strictness)
            }
        }
    }
}

/// Configures and opens a [`ConfigStore`].
pub struct StoreBuilder {
    file_path: PathBuf,
    defaults: Value,
    options: StoreOptions,
    backend: Option<Arc<dyn FileBackend>>,
}

impl StoreBuilder {
    fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            defaults: Value::Object(Document::new()),
            options: StoreOptions::default(),
            backend: None,
        }
    }

    /// Values visible underneath whatever the file holds.  Must be an object.
    pub fn defaults(mut self, defaults: Value) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the local file system backend.
    pub fn backend(mut self, backend: Arc<dyn FileBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Opens the store on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// See [`blocking_open`](Self::blocking_open).
    pub async fn open(self) -> Result<ConfigStore, StoreError> {
        tokio::task::spawn_blocking(move || self.blocking_open()).await?
    }

    /// Opens the store on the calling thread.
    ///
    /// An existing file is read once so that malformed content is reported
    /// here rather than on first use.  A missing file is written immediately
    /// when `create_if_non_existent` is set, rejected when
    /// `fail_if_non_existent` is set, and otherwise created by the first
    /// successful write.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidDefaults`] if the defaults are not an object.
    /// - [`StoreError::InvalidJson`] if the existing file is malformed.
    /// - [`StoreError::NotFound`] for a missing file under
    ///   `fail_if_non_existent`.
    /// - [`StoreError::Io`] if the file cannot be read or created, or the
    ///   watcher thread cannot be started.
    pub fn blocking_open(self) -> Result<ConfigStore, StoreError> {
        let defaults = match self.defaults {
            Value::Object(map) => map,
            other => return Err(StoreError::InvalidDefaults(ValueKind::of(Some(&other)))),
        };
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(LocalFileBackend::new()));

        let mut inner = Inner {
            file_path: self.file_path,
            defaults,
            options: self.options,
            backend,
            stale: ChangeSignal::new(),
            state: Arc::new(Mutex::new(Snapshot::default())),
        };

        // Started first so its baseline stamp predates the read below.
        let watcher = if inner.options.watch {
            let watcher = FileWatcher::spawn(
                inner.file_path.clone(),
                Arc::clone(&inner.backend),
                inner.stale.clone(),
                inner.options.watch_interval(),
            )
            .map_err(|source| StoreError::Io {
                path: inner.file_path.clone(),
                source,
            })?;
            Some(watcher)
        } else {
            None
        };

        let mut snapshot = Snapshot::default();
        if inner.backend.exists(&inner.file_path) {
            let document = inner.read_document()?;
            if inner.options.watch {
                snapshot.document = Some(document);
            }
        } else if inner.options.create_if_non_existent {
            inner.persist(&inner.defaults)?;
            info!(path = %inner.file_path.display(), "created config file");
        } else if inner.options.fail_if_non_existent {
            return Err(StoreError::NotFound {
                path: inner.file_path,
            });
        }
        inner.state = Arc::new(Mutex::new(snapshot));

        debug!(path = %inner.file_path.display(), "store opened");
        Ok(ConfigStore {
            inner: Arc::new(inner),
            watcher,
        })
    }
}

/// What the lock protects.  `document` is only populated in watch mode.
#[derive(Debug, Default)]
struct Snapshot {
    document: Option<Document>,
}

struct Inner {
    file_path: PathBuf,
    defaults: Document,
    options: StoreOptions,
    backend: Arc<dyn FileBackend>,
    stale: ChangeSignal,
    state: Arc<Mutex<Snapshot>>,
}

impl Inner {
    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.file_path.clone(),
            source,
        }
    }

    /// Reads the file and lays the defaults underneath.  A missing file reads
    /// as the defaults alone.
    fn read_document(&self) -> Result<Document, StoreError> {
        let bytes = match self.backend.read(&self.file_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(self.defaults.clone()),
            Err(e) => return Err(self.io_error(e)),
        };
        let persisted =
            codec::decode(&bytes, self.options.allow_comments).map_err(|source| {
                StoreError::InvalidJson {
                    path: self.file_path.clone(),
                    source,
                }
            })?;
        debug!(path = %self.file_path.display(), bytes = bytes.len(), "read config file");
        Ok(merge_defaults(&self.defaults, persisted))
    }

    /// The current document: the cached snapshot when it is fresh, the file
    /// otherwise.
    fn load<'s>(&self, snapshot: &'s mut Snapshot) -> Result<Cow<'s, Document>, StoreError> {
        if !self.options.watch {
            return Ok(Cow::Owned(self.read_document()?));
        }
        let stale = self.stale.take();
        let document = match snapshot.document.take() {
            Some(document) if !stale => document,
            _ => {
                debug!(path = %self.file_path.display(), "snapshot stale, reloading");
                self.read_document()?
            }
        };
        Ok(Cow::Borrowed(snapshot.document.insert(document)))
    }

    fn persist(&self, document: &Document) -> Result<(), StoreError> {
        let bytes = codec::encode(document, self.options.pretty_print)?;
        let written = if self.options.atomic_writes {
            self.backend.write_atomic(&self.file_path, &bytes)
        } else {
            self.backend.write(&self.file_path, &bytes)
        };
        written.map_err(|e| self.io_error(e))?;
        debug!(
            path = %self.file_path.display(),
            bytes = bytes.len(),
            atomic = self.options.atomic_writes,
            "wrote config file"
        );
        Ok(())
    }

    fn read_value(
        &self,
        snapshot: &mut Snapshot,
        path: &KeyPath,
    ) -> Result<Option<Value>, StoreError> {
        let document = self.load(snapshot)?;
        if path.is_root() {
            return Ok(Some(Value::Object(document.into_owned())));
        }
        match deep_get_in(&document, path) {
            Ok(Some(Value::Null)) | Ok(None) => Ok(None),
            Ok(Some(value)) => Ok(Some(value.clone())),
            Err(e) => {
                debug!("{e}; reading as absent");
                Ok(None)
            }
        }
    }

    fn mutate(
        &self,
        snapshot: &mut Snapshot,
        mutation: Mutation,
        strictness: Strictness,
    ) -> Result<(), StoreError> {
        let mut document = self.load(snapshot)?.into_owned();
        debug!(path = %mutation.path(), ?strictness, "applying mutation");
        mutation.apply_to(&mut document, strictness)?;
        self.persist(&document)?;
        if self.options.watch {
            snapshot.document = Some(document);
        }
        Ok(())
    }

    fn reload(&self, snapshot: &mut Snapshot) -> Result<(), StoreError> {
        self.stale.take();
        snapshot.document = None;
        let document = self.read_document()?;
        if self.options.watch {
            snapshot.document = Some(document);
        }
        Ok(())
    }

    fn default_strictness(&self) -> Strictness {
        Strictness::from_flag(self.options.strict_access)
    }
}

fn convert<T: DeserializeOwned>(
    path: &KeyPath,
    value: Option<Value>,
) -> Result<Option<T>, StoreError> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(|source| StoreError::TypeMismatch {
            path: path.to_string(),
            source,
        })
}

/// A JSON config file with dotted-path access.
///
/// Share a store between tasks with `Arc<ConfigStore>`; all methods take
/// `&self`.  Dropping the store stops its watcher.
pub struct ConfigStore {
    inner: Arc<Inner>,
    watcher: Option<FileWatcher>,
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("file_path", &self.inner.file_path)
            .field("options", &self.inner.options)
            .field("watching", &self.watcher.is_some())
            .finish()
    }
}

impl ConfigStore {
    /// Starts configuring a store backed by `file_path`.
    pub fn builder(file_path: impl Into<PathBuf>) -> StoreBuilder {
        StoreBuilder::new(file_path.into())
    }

    pub fn file_path(&self) -> &Path {
        &self.inner.file_path
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    /// The flag that marks the cached snapshot stale.  Only meaningful with
    /// `watch` enabled.
    pub fn change_signal(&self) -> ChangeSignal {
        self.inner.stale.clone()
    }

    async fn run<R, F>(&self, op: F) -> Result<R, StoreError>
    where
        R: Send + 'static,
        F: FnOnce(&Inner, &mut Snapshot) -> Result<R, StoreError> + Send + 'static,
    {
        let mut guard = Arc::clone(&self.inner.state).lock_owned().await;
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner, &mut guard)).await?
    }

    fn run_blocking<R>(
        &self,
        op: impl FnOnce(&Inner, &mut Snapshot) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut guard = self.inner.state.blocking_lock();
        op(&self.inner, &mut guard)
    }

    // ── Async API ─────────────────────────────────────────────────────────────

    /// Returns the value at `path`, or `None` if it is absent, `null`, or
    /// unreachable.
    ///
    /// # Errors
    ///
    /// Only I/O and decode failures.  Structural mismatches read as `None`.
    pub async fn get(&self, path: impl Into<KeyPath>) -> Result<Option<Value>, StoreError> {
        let path = path.into();
        self.run(move |inner, snapshot| inner.read_value(snapshot, &path))
            .await
    }

    /// Like [`get`](Self::get), with `fallback` for an absent value.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub async fn get_or(
        &self,
        path: impl Into<KeyPath>,
        fallback: Value,
    ) -> Result<Value, StoreError> {
        Ok(self.get(path).await?.unwrap_or(fallback))
    }

    /// Like [`get`](Self::get), deserialized into `T`.
    ///
    /// # Errors
    ///
    /// [`StoreError::TypeMismatch`] if the stored value does not fit `T`.
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        path: impl Into<KeyPath>,
    ) -> Result<Option<T>, StoreError> {
        let path = path.into();
        let value = self.get(&path).await?;
        convert(&path, value)
    }

    /// Stores `value` at `path`, creating missing parents.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Path`] when the path cannot be written.
    /// - [`StoreError::Io`] when the file cannot be written.
    pub async fn set(
        &self,
        path: impl Into<KeyPath>,
        value: impl Serialize,
    ) -> Result<(), StoreError> {
        let mutation = Mutation::set(path, serde_json::to_value(value)?);
        self.apply(mutation, self.inner.default_strictness()).await
    }

    /// Removes the value at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub async fn delete(&self, path: impl Into<KeyPath>) -> Result<(), StoreError> {
        self.apply(Mutation::delete(path), self.inner.default_strictness())
            .await
    }

    /// Pushes `value` onto the existing sequence at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set), plus [`StoreError::Path`] when the target
    /// is absent or is not a sequence.
    pub async fn append(
        &self,
        path: impl Into<KeyPath>,
        value: impl Serialize,
    ) -> Result<(), StoreError> {
        let mutation = Mutation::append(path, serde_json::to_value(value)?);
        self.apply(mutation, self.inner.default_strictness()).await
    }

    /// Applies `mutation` with an explicit strictness.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub async fn apply(
        &self,
        mutation: Mutation,
        strictness: Strictness,
    ) -> Result<(), StoreError> {
        self.run(move |inner, snapshot| inner.mutate(snapshot, mutation, strictness))
            .await
    }

    /// Discards the cached snapshot and re-reads the file now.
    ///
    /// # Errors
    ///
    /// I/O and decode failures.
    pub async fn reload(&self) -> Result<(), StoreError> {
        self.run(|inner, snapshot| inner.reload(snapshot)).await
    }

    /// Stops the watcher, if any, and releases the store.
    ///
    /// # Errors
    ///
    /// [`StoreError::Task`] if the watcher could not be joined.
    pub async fn close(mut self) -> Result<(), StoreError> {
        if let Some(mut watcher) = self.watcher.take() {
            tokio::task::spawn_blocking(move || watcher.stop()).await?;
        }
        debug!(path = %self.inner.file_path.display(), "store closed");
        Ok(())
    }

    // ── Blocking API ──────────────────────────────────────────────────────────

    /// Blocking form of [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime, where the store lock
    /// cannot be waited on synchronously.  Use the async form there.
    pub fn blocking_get(&self, path: impl Into<KeyPath>) -> Result<Option<Value>, StoreError> {
        let path = path.into();
        self.run_blocking(|inner, snapshot| inner.read_value(snapshot, &path))
    }

    /// Blocking form of [`get_or`](Self::get_or).
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime, where the store lock
    /// cannot be waited on synchronously.  Use the async form there.
    pub fn blocking_get_or(
        &self,
        path: impl Into<KeyPath>,
        fallback: Value,
    ) -> Result<Value, StoreError> {
        Ok(self.blocking_get(path)?.unwrap_or(fallback))
    }

    /// Blocking form of [`get_as`](Self::get_as).
    ///
    /// # Errors
    ///
    /// Same as [`get_as`](Self::get_as).
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime, where the store lock
    /// cannot be waited on synchronously.  Use the async form there.
    pub fn blocking_get_as<T: DeserializeOwned>(
        &self,
        path: impl Into<KeyPath>,
    ) -> Result<Option<T>, StoreError> {
        let path = path.into();
        let value = self.blocking_get(&path)?;
        convert(&path, value)
    }

    /// Blocking form of [`set`](Self::set).
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime, where the store lock
    /// cannot be waited on synchronously.  Use the async form there.
    pub fn blocking_set(
        &self,
        path: impl Into<KeyPath>,
        value: impl Serialize,
    ) -> Result<(), StoreError> {
        let mutation = Mutation::set(path, serde_json::to_value(value)?);
        self.blocking_apply(mutation, self.inner.default_strictness())
    }

    /// Blocking form of [`delete`](Self::delete).
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime, where the store lock
    /// cannot be waited on synchronously.  Use the async form there.
    pub fn blocking_delete(&self, path: impl Into<KeyPath>) -> Result<(), StoreError> {
        self.blocking_apply(Mutation::delete(path), self.inner.default_strictness())
    }

    /// Blocking form of [`append`](Self::append).
    ///
    /// # Errors
    ///
    /// Same as [`append`](Self::append).
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime, where the store lock
    /// cannot be waited on synchronously.  Use the async form there.
    pub fn blocking_append(
        &self,
        path: impl Into<KeyPath>,
        value: impl Serialize,
    ) -> Result<(), StoreError> {
        let mutation = Mutation::append(path, serde_json::to_value(value)?);
        self.blocking_apply(mutation, self.inner.default_strictness())
    }

    /// Blocking form of [`apply`](Self::apply).
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime, where the store lock
    /// cannot be waited on synchronously.  Use the async form there.
    pub fn blocking_apply(
        &self,
        mutation: Mutation,
        strictness: Strictness,
    ) -> Result<(), StoreError> {
        self.run_blocking(|inner, snapshot| inner.mutate(snapshot, mutation, strictness))
    }

    /// Blocking form of [`reload`](Self::reload).
    ///
    /// # Errors
    ///
    /// Same as [`reload`](Self::reload).
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime, where the store lock
    /// cannot be waited on synchronously.  Use the async form there.
    pub fn blocking_reload(&self) -> Result<(), StoreError> {
        self.run_blocking(|inner, snapshot| inner.reload(snapshot))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resolver::WriteFault;
    use crate::infrastructure::storage::MockFileBackend;
    use mockall::Sequence;
    use serde_json::json;

    fn not_found() -> io::Error {
        io::Error::from(io::ErrorKind::NotFound)
    }

    /// A backend whose file does not exist yet.
    fn missing_file_backend() -> MockFileBackend {
        let mut backend = MockFileBackend::new();
        backend.expect_exists().return_const(false);
        backend.expect_read().returning(|_| Err(not_found()));
        backend
    }

    /// A backend serving fixed file contents.
    fn backend_with(contents: &'static str) -> MockFileBackend {
        let mut backend = MockFileBackend::new();
        backend.expect_exists().return_const(true);
        backend
            .expect_read()
            .returning(move |_| Ok(contents.as_bytes().to_vec()));
        backend
    }

    fn open(backend: MockFileBackend, options: StoreOptions) -> Result<ConfigStore, StoreError> {
        ConfigStore::builder("config.json")
            .options(options)
            .backend(Arc::new(backend))
            .blocking_open()
    }

    // ── open ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_open_missing_file_is_deferred_by_default() {
        let mut backend = missing_file_backend();
        backend.expect_write_atomic().never();
        backend.expect_write().never();

        let store = open(backend, StoreOptions::default()).expect("open");

        assert_eq!(store.blocking_get("anything").unwrap(), None);
    }

    #[test]
    fn test_open_creates_file_with_defaults() {
        // Arrange
        let mut backend = missing_file_backend();
        backend
            .expect_write_atomic()
            .withf(|path, bytes| path == Path::new("config.json") && bytes == b"{\"port\":80}\n")
            .times(1)
            .returning(|_, _| Ok(()));
        let options = StoreOptions {
            create_if_non_existent: true,
            pretty_print: false,
            ..StoreOptions::default()
        };

        // Act
        let result = ConfigStore::builder("config.json")
            .defaults(json!({ "port": 80 }))
            .options(options)
            .backend(Arc::new(backend))
            .blocking_open();

        // Assert
        assert!(result.is_ok());
    }

    #[test]
    fn test_open_fails_on_missing_file_when_required() {
        let backend = missing_file_backend();
        let options = StoreOptions {
            fail_if_non_existent: true,
            ..StoreOptions::default()
        };

        let err = open(backend, options).unwrap_err();

        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_open_create_takes_precedence_over_fail() {
        let mut backend = missing_file_backend();
        backend.expect_write_atomic().times(1).returning(|_, _| Ok(()));
        let options = StoreOptions {
            create_if_non_existent: true,
            fail_if_non_existent: true,
            ..StoreOptions::default()
        };

        assert!(open(backend, options).is_ok());
    }

    #[test]
    fn test_open_reports_malformed_file() {
        let err = open(backend_with("{ nope"), StoreOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidJson {
                source: DecodeError::Syntax(_),
                ..
            }
        ));
    }

    #[test]
    fn test_open_rejects_non_object_defaults() {
        let err = ConfigStore::builder("config.json")
            .defaults(json!([1, 2]))
            .backend(Arc::new(missing_file_backend()))
            .blocking_open()
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidDefaults(ValueKind::Array)));
    }

    // ── reads ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_get_reads_defaults_underneath_file() {
        let store = ConfigStore::builder("config.json")
            .defaults(json!({
                "server": { "host": "localhost", "port": 80 },
                "log": { "level": "info" }
            }))
            .backend(Arc::new(backend_with(r#"{"server":{"port":8080}}"#)))
            .blocking_open()
            .expect("open");

        // The file's `server` replaces the default section as a whole.
        assert_eq!(store.blocking_get("server").unwrap(), Some(json!({ "port": 8080 })));
        assert_eq!(store.blocking_get("server.host").unwrap(), None);
        assert_eq!(store.blocking_get("log.level").unwrap(), Some(json!("info")));
    }

    #[test]
    fn test_get_treats_null_and_unreachable_as_absent() {
        let store = open(backend_with(r#"{"hole":null,"flag":true}"#), StoreOptions::default())
            .expect("open");

        assert_eq!(store.blocking_get("hole").unwrap(), None);
        assert_eq!(store.blocking_get("flag.inner").unwrap(), None);
        assert_eq!(store.blocking_get_or("flag.inner", json!(7)).unwrap(), json!(7));
    }

    #[test]
    fn test_get_root_returns_whole_document() {
        let store = open(backend_with(r#"{"a":1}"#), StoreOptions::default()).expect("open");
        assert_eq!(store.blocking_get("").unwrap(), Some(json!({ "a": 1 })));
    }

    #[test]
    fn test_get_as_reports_type_mismatch() {
        let store = open(backend_with(r#"{"port":"eighty"}"#), StoreOptions::default())
            .expect("open");

        let err = store.blocking_get_as::<u16>("port").unwrap_err();

        assert!(matches!(err, StoreError::TypeMismatch { ref path, .. } if path == "port"));
        assert_eq!(store.blocking_get_as::<u16>("missing").unwrap(), None);
    }

    // ── writes ────────────────────────────────────────────────────────────────

    #[test]
    fn test_set_uses_atomic_write_by_default() {
        let mut backend = backend_with("{}");
        backend
            .expect_write_atomic()
            .times(1)
            .returning(|_, _| Ok(()));
        backend.expect_write().never();
        let store = open(backend, StoreOptions::default()).expect("open");

        store.blocking_set("a", 1).expect("set");
    }

    #[test]
    fn test_set_uses_plain_write_when_atomic_disabled() {
        let mut backend = backend_with("{}");
        backend
            .expect_write()
            .withf(|_, bytes| bytes == b"{\n  \"a\": 1\n}\n")
            .times(1)
            .returning(|_, _| Ok(()));
        backend.expect_write_atomic().never();
        let options = StoreOptions {
            atomic_writes: false,
            ..StoreOptions::default()
        };
        let store = open(backend, options).expect("open");

        store.blocking_set("a", 1).expect("set");
    }

    #[test]
    fn test_write_failure_is_reported_as_io_error() {
        let mut backend = backend_with("{}");
        backend
            .expect_write_atomic()
            .returning(|_, _| Err(io::Error::from(io::ErrorKind::PermissionDenied)));
        let store = open(backend, StoreOptions::default()).expect("open");

        let err = store.blocking_set("a", 1).unwrap_err();

        assert!(matches!(
            err,
            StoreError::Io { ref source, .. } if source.kind() == io::ErrorKind::PermissionDenied
        ));
    }

    #[test]
    fn test_failed_mutation_writes_nothing() {
        // Arrange
        let mut backend = backend_with(r#"{"flag":true,"list":[1]}"#);
        backend.expect_write_atomic().never();
        let store = open(backend, StoreOptions::default()).expect("open");

        // Act
        let strict =
            store.blocking_apply(Mutation::set("flag.inner", json!(1)), Strictness::Strict);
        let non_index = store.blocking_set("list.key", 1);
        let not_a_sequence = store.blocking_append("flag", 1);

        // Assert
        assert!(matches!(strict, Err(StoreError::Path(PathError::InvalidAccess { .. }))));
        assert!(matches!(
            non_index,
            Err(StoreError::Path(PathError::InvalidWrite {
                fault: WriteFault::NonIndexKey { .. },
                ..
            }))
        ));
        assert!(matches!(
            not_a_sequence,
            Err(StoreError::Path(PathError::InvalidWrite {
                fault: WriteFault::NotASequence { kind: ValueKind::Bool },
                ..
            }))
        ));
    }

    #[test]
    fn test_strict_access_option_sets_default_strictness() {
        let mut backend = backend_with(r#"{"flag":true}"#);
        backend.expect_write_atomic().never();
        let options = StoreOptions {
            strict_access: true,
            ..StoreOptions::default()
        };
        let store = open(backend, options).expect("open");

        let err = store.blocking_set("flag.inner", 1).unwrap_err();

        assert!(matches!(err, StoreError::Path(PathError::InvalidAccess { .. })));
    }

    // ── watch / caching ───────────────────────────────────────────────────────

    fn watched() -> StoreOptions {
        StoreOptions {
            watch: true,
            watch_interval_ms: 60_000,
            ..StoreOptions::default()
        }
    }

    #[test]
    fn test_watch_mode_caches_document_until_signalled() {
        // Arrange: one read at open, one after the signal.
        let mut backend = MockFileBackend::new();
        backend.expect_exists().return_const(true);
        backend.expect_stamp().returning(|_| Ok(None));
        backend
            .expect_read()
            .times(2)
            .returning(|_| Ok(b"{\"a\":1}".to_vec()));
        let store = open(backend, watched()).expect("open");

        // Act
        store.blocking_get("a").unwrap();
        store.blocking_get("a").unwrap();
        store.change_signal().mark();
        let after = store.blocking_get("a").unwrap();

        // Assert
        assert_eq!(after, Some(json!(1)));
    }

    #[test]
    fn test_watch_baseline_is_taken_before_first_read() {
        // Arrange: an edit between the read and the baseline would be lost.
        let mut seq = Sequence::new();
        let mut backend = MockFileBackend::new();
        backend.expect_exists().return_const(true);
        backend
            .expect_stamp()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        backend
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(b"{}".to_vec()));

        // Act
        let store = open(backend, watched()).expect("open");

        // Assert: the mock checks the call order as it is dropped.
        drop(store);
    }

    #[test]
    fn test_without_watch_every_read_hits_the_file() {
        let mut backend = MockFileBackend::new();
        backend.expect_exists().return_const(true);
        backend
            .expect_read()
            .times(3)
            .returning(|_| Ok(b"{}".to_vec()));
        let store = open(backend, StoreOptions::default()).expect("open");

        store.blocking_get("a").unwrap();
        store.blocking_get("a").unwrap();
    }

    #[tokio::test]
    async fn test_async_forms_share_the_cycle() {
        let mut backend = backend_with(r#"{"list":["x"]}"#);
        backend
            .expect_write_atomic()
            .withf(|_, bytes| bytes == b"{\n  \"list\": [\n    \"x\",\n    \"y\"\n  ]\n}\n")
            .times(1)
            .returning(|_, _| Ok(()));
        let store = ConfigStore::builder("config.json")
            .backend(Arc::new(backend))
            .open()
            .await
            .expect("open");

        store.append("list", "y").await.expect("append");
        // The mock never persists, so reads still see the original contents.
        let list = store.get_as::<Vec<String>>("list").await.unwrap();
        assert_eq!(list, Some(vec!["x".to_string()]));
        store.close().await.expect("close");
    }
}
