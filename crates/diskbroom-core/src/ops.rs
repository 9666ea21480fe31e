/// The operations a frontend calls — plain data in, plain data out.
///
/// Scanning lives in [`crate::scanner`], trash operations on
/// [`crate::trash::TrashManager`], watches in [`crate::watch`]; this module
/// adds the small direct operations (browse, probe, rename) and re-exports
/// the rest so a presentation layer needs a single import.
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{with_fd_backoff, Error, Result};
use crate::model::{Category, Entry, EntryKind};
use crate::statcache::{EntryMeta, StatCache};

pub use crate::scanner::{scan_flat, scan_tree, start_scan, ScanMode, ScanOptions};
pub use crate::trash::TrashManager;
pub use crate::watch::{start_watch, start_watch_bridged, WatchHandle, WatchMessage};

/// List the immediate children of `path` with metadata, non-recursively.
///
/// Children that fail to stat are omitted with a warning rather than
/// failing the listing; a directory that cannot be opened at all fails.
pub fn list_directory(path: &Path, cache: Option<&StatCache>) -> Result<Vec<Entry>> {
    let read_dir = with_fd_backoff(|| fs::read_dir(path)).map_err(|e| Error::from_io(e, path))?;

    let mut entries = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = match dir_entry {
            Ok(e) => e,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable directory entry");
                continue;
            }
        };
        let child_path = dir_entry.path();
        let meta = match cache {
            Some(cache) => cache.stat(&child_path),
            None => fs::symlink_metadata(&child_path).map(|m| EntryMeta::of(&m)),
        };
        let meta = match meta {
            Ok(m) => m,
            Err(err) => {
                warn!(path = %child_path.display(), error = %err, "stat failed, entry omitted");
                continue;
            }
        };

        let name = dir_entry.file_name().to_string_lossy().into_owned();
        let category = Category::of(&name, meta.kind);
        entries.push(Entry {
            name,
            path: child_path,
            kind: meta.kind,
            size_bytes: if meta.kind == EntryKind::Directory {
                0
            } else {
                meta.len
            },
            modified: meta.modified,
            category,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Probe whether `path` can be read. A directory must be listable, a file
/// must be openable. Never errors; the answer is the result.
pub fn check_access(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::read_dir(path).is_ok(),
        Ok(_) => fs::File::open(path).is_ok(),
        Err(_) => false,
    }
}

/// Atomically rename `old` to `new`.
///
/// The source must exist and the destination's parent directory must be
/// present; an occupied destination is a conflict, not an overwrite.
pub fn rename_entry(old: &Path, new: &Path) -> Result<()> {
    if fs::symlink_metadata(old).is_err() {
        return Err(Error::NotFound(old.display().to_string()));
    }
    if fs::symlink_metadata(new).is_ok() {
        return Err(Error::RestoreConflict(new.to_path_buf()));
    }
    match new.parent() {
        Some(parent) if parent.as_os_str().is_empty() || parent.is_dir() => {}
        Some(parent) => return Err(Error::DestinationUnavailable(parent.to_path_buf())),
        None => return Err(Error::DestinationUnavailable(new.to_path_buf())),
    }
    fs::rename(old, new).map_err(|e| Error::from_io(e, old))
}
