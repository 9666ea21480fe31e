/// Filesystem watch bridge.
///
/// Wraps a native watcher ([`notify`]) around a directory and turns its
/// event stream into two things:
/// - [`WatchMessage::Changed`] messages on the handle's receiver, and
/// - optionally, change notifications into a [`Scheduler`], where they are
///   debounced and coalesced with explicit scan requests for the same path.
///
/// # Cancellation
///
/// Call [`WatchHandle::stop`] for a deterministic stop: the callback drops
/// every event after the flag is set, even while the native watch is still
/// being torn down. Dropping the handle releases the native watch itself.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::scheduler::Scheduler;

/// Maximum number of change messages queued for a slow consumer. Beyond
/// this the messages are dropped; a watch is a hint, not a log.
const WATCH_CHANNEL_CAPACITY: usize = 2_048;

/// Message sent for each relevant filesystem event under the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchMessage {
    /// Something under the watched directory was created, modified,
    /// renamed, or removed. The path is the affected entry.
    Changed(PathBuf),
}

/// Handle to a running directory watch.
pub struct WatchHandle {
    /// Receive [`WatchMessage`] events from the native watcher.
    pub receiver: Receiver<WatchMessage>,
    cancel: Arc<AtomicBool>,
    // Keeps the native watch registered; dropping it releases the OS watch.
    _watcher: RecommendedWatcher,
}

impl WatchHandle {
    /// Stop forwarding events. Idempotent, non-blocking.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Watch `path` recursively, reporting changes on the handle's receiver.
pub fn start_watch(path: &Path) -> Result<WatchHandle> {
    watch_inner(path, None)
}

/// Watch `path` recursively and additionally feed every change into
/// `scheduler` as a change notification for that directory, so that a
/// standing scan for the path re-runs after the scheduler's debounce.
pub fn start_watch_bridged(path: &Path, scheduler: Scheduler) -> Result<WatchHandle> {
    watch_inner(path, Some(scheduler))
}

fn watch_inner(path: &Path, scheduler: Option<Scheduler>) -> Result<WatchHandle> {
    let (tx, rx) = bounded::<WatchMessage>(WATCH_CHANNEL_CAPACITY);
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_cb = Arc::clone(&cancel);
    let watched_root = path.to_path_buf();

    let mut watcher =
        notify::recommended_watcher(move |res: notify::Result<Event>| {
            if cancel_cb.load(Ordering::Relaxed) {
                return;
            }
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    warn!(error = %err, "watch event error");
                    return;
                }
            };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            if let Some(scheduler) = &scheduler {
                // The scheduler keys standing scans by the watched root,
                // not the individual entry that changed.
                scheduler.notify_changed(&watched_root);
            }
            for affected in event.paths {
                // Consumer may be slow or gone; dropping is fine.
                let _ = tx.try_send(WatchMessage::Changed(affected));
            }
        })
        .map_err(watch_error)?;

    watcher
        .watch(path, RecursiveMode::Recursive)
        .map_err(watch_error)?;
    debug!(path = %path.display(), "watch started");

    Ok(WatchHandle {
        receiver: rx,
        cancel,
        _watcher: watcher,
    })
}

/// The native watcher reports its own error type; fold it into ours,
/// preserving an io kind where one exists.
fn watch_error(err: notify::Error) -> Error {
    match err.kind {
        notify::ErrorKind::Io(io_err) => Error::Io(io_err),
        notify::ErrorKind::PathNotFound => Error::NotFound(format!("{err}")),
        other => Error::Io(std::io::Error::other(format!("watch: {other:?}"))),
    }
}
