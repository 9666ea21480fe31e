/// Error kinds surfaced by the core crate.
///
/// Traversal absorbs per-entry failures locally (the entry is omitted or
/// flagged, the scan still completes); trash and ops-level operations surface
/// their kind to the caller because they are explicit user-directed actions.
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The path is syntactically invalid or escapes the permitted roots.
    /// Distinct from [`Error::NotFound`] / [`Error::PermissionDenied`]:
    /// validity is checked without touching the entry itself.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The restore target's parent directory no longer exists.
    #[error("destination unavailable: {}", .0.display())]
    DestinationUnavailable(PathBuf),

    /// Something new occupies the original path of a trashed item.
    /// The trashed item is left untouched; the caller decides what to do.
    #[error("restore conflict: {} already exists", .0.display())]
    RestoreConflict(PathBuf),

    /// Descriptor or handle limits hit. Retried with backoff at the failing
    /// operation, never escalated to abort a whole scan.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("i/o failure")]
    Io(#[from] io::Error),
}

impl Error {
    /// Map an [`io::Error`] observed at `path` to the matching error kind.
    /// The single mapping point for the whole crate.
    pub(crate) fn from_io(err: io::Error, path: &Path) -> Self {
        if is_resource_exhausted(&err) {
            return Error::ResourceExhausted(path.display().to_string());
        }
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(path.to_path_buf()),
            _ => Error::Io(err),
        }
    }
}

/// EMFILE / ENFILE — the process or system is out of file descriptors.
pub(crate) fn is_resource_exhausted(err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        matches!(err.raw_os_error(), Some(23) | Some(24))
    }
    #[cfg(not(unix))]
    {
        let _ = err;
        false
    }
}

/// Retry `op` a few times with growing sleeps when it fails with a
/// descriptor-exhaustion error. Any other error returns immediately.
pub(crate) fn with_fd_backoff<T>(mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut delay = Duration::from_millis(10);
    for _ in 0..3 {
        match op() {
            Err(e) if is_resource_exhausted(&e) => {
                std::thread::sleep(delay);
                delay *= 4;
            }
            other => return other,
        }
    }
    op()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(matches!(
            Error::from_io(err, Path::new("/tmp/x")),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn io_permission_denied_maps_to_permission_denied() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            Error::from_io(err, Path::new("/tmp/x")),
            Error::PermissionDenied(_)
        ));
    }

    #[test]
    fn backoff_passes_through_success() {
        let value = with_fd_backoff(|| Ok::<_, io::Error>(7)).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn backoff_does_not_retry_other_errors() {
        let mut calls = 0;
        let result: io::Result<()> = with_fd_backoff(|| {
            calls += 1;
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1, "non-exhaustion errors must not be retried");
    }
}
