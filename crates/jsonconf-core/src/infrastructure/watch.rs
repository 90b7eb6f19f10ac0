//! Change detection for the backing file.
//!
//! The store only needs one bit of information from a watcher: "the file may
//! have changed since you last read it".  That bit is a [`ChangeSignal`].
//! Anything can set it; [`FileWatcher`] is the built-in source, which polls
//! the file's [`FileStamp`] (modification time + length) on a dedicated
//! thread.
//!
//! Polling keeps the watcher portable and dependency-free.  The cost is
//! latency: an external edit is noticed within one poll interval.  The
//! watcher thread parks between polls and is unparked on shutdown, so
//! [`FileWatcher::stop`] returns promptly.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::infrastructure::storage::{FileBackend, FileStamp};

/// A shareable "snapshot is stale" flag.
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct ChangeSignal {
    dirty: Arc<AtomicBool>,
}

impl ChangeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the snapshot stale.
    pub fn mark(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Returns whether the flag was set, clearing it.
    pub fn take(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Returns whether the flag is set without clearing it.
    pub fn is_marked(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}

/// Background poller that marks a [`ChangeSignal`] whenever the watched
/// file's stamp changes.
///
/// Dropping the watcher stops the thread.
pub struct FileWatcher {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FileWatcher {
    /// Starts polling `path` every `interval`.
    ///
    /// The first stamp is taken before this returns, so only changes made
    /// after `spawn` are reported.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(
        path: PathBuf,
        backend: Arc<dyn FileBackend>,
        signal: ChangeSignal,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let initial = backend.stamp(&path).ok().flatten();

        let thread_running = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name("jsonconf-watch".to_string())
            .spawn(move || {
                watch_loop(&path, backend.as_ref(), &signal, initial, interval, &thread_running);
            })?;

        info!("file watcher started (poll every {interval:?})");
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Returns `true` until [`stop`](Self::stop) is called.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stops the poll thread and waits for it to exit.  Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("file watcher thread panicked");
            }
            info!("file watcher stopped");
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch_loop(
    path: &std::path::Path,
    backend: &dyn FileBackend,
    signal: &ChangeSignal,
    mut last: Option<FileStamp>,
    interval: Duration,
    running: &AtomicBool,
) {
    while running.load(Ordering::Relaxed) {
        std::thread::park_timeout(interval);
        if !running.load(Ordering::Relaxed) {
            break;
        }

        match backend.stamp(path) {
            Ok(current) if current != last => {
                debug!(path = %path.display(), "change detected");
                last = current;
                signal.mark();
            }
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), "failed to stat watched file: {e}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
