/// Soft-delete ("trash") manager with crash-consistent journaling.
///
/// Ordering rules, fixed and asymmetric on purpose:
/// - **soft delete**: journal append first, then move. A crash in between
///   leaves a record pointing at a file still at its original path —
///   recovery drops the record and the user has lost nothing.
/// - **restore / purge**: move (or remove) first, then drop the record. The
///   record's absence would be the unsafe state here, so it must outlive
///   the filesystem effect it describes.
///
/// The manager exclusively owns the trash storage directory; the journal
/// store exclusively owns the manifest file inside it. Operations are
/// serialized process-wide under one lock, which also covers the per-id
/// serialization requirement.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{with_fd_backoff, Error, Result};
use crate::model::EntryKind;
use journal::{JournalStore, TrashRecord};

pub mod journal;

/// Manifest file name inside the storage root. Stored copies are named
/// `<uuid>-<basename>`, which can never collide with it.
const MANIFEST_NAME: &str = "manifest.json";

#[derive(Debug)]
pub struct TrashManager {
    storage_dir: PathBuf,
    journal: JournalStore,
    /// Serializes soft_delete/restore/purge process-wide.
    op_lock: Mutex<()>,
}

impl TrashManager {
    /// Open (creating if needed) the trash rooted at `storage_dir` and run
    /// crash recovery against the journal.
    pub fn open(storage_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&storage_dir).map_err(|e| Error::from_io(e, &storage_dir))?;
        let journal = JournalStore::open(storage_dir.join(MANIFEST_NAME))?;
        let manager = Self {
            storage_dir,
            journal,
            op_lock: Mutex::new(()),
        };
        manager.recover()?;
        Ok(manager)
    }

    /// Where stored copies live.
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Current journal contents, oldest first.
    pub fn list(&self) -> Vec<TrashRecord> {
        self.journal.snapshot()
    }

    /// Soft-delete `original`: journal append, then move into storage.
    pub fn soft_delete(&self, original: &Path) -> Result<TrashRecord> {
        let _guard = self.op_lock.lock();

        let meta = fs::symlink_metadata(original).map_err(|e| Error::from_io(e, original))?;
        let kind = EntryKind::of(meta.file_type());
        let size_bytes = if kind == EntryKind::Directory {
            0
        } else {
            meta.len()
        };

        let id = Uuid::new_v4();
        let basename = original
            .file_name()
            .ok_or_else(|| Error::InvalidPath(format!("{}: no file name", original.display())))?;
        // Keep the stored copy human-identifiable: id first for uniqueness,
        // original basename after it.
        let stored_name = format!("{id}-{}", basename.to_string_lossy());
        let stored_path = self.storage_dir.join(stored_name);

        let record = TrashRecord {
            id,
            original_path: original.to_path_buf(),
            stored_path: stored_path.clone(),
            size_bytes,
            kind,
            deleted_at: Utc::now(),
        };

        // (a) journal first — the record must exist before the file moves,
        // or a crash could leave a moved file with no record of where.
        self.journal.append(record.clone())?;

        // (b) then move. A clean in-process failure rolls the record back;
        // a crash in between is handled by recover().
        if let Err(e) = move_entry(original, &stored_path) {
            let _ = self.journal.remove(id);
            return Err(Error::from_io(e, original));
        }

        info!(id = %id, path = %original.display(), "soft-deleted");
        Ok(record)
    }

    /// Restore the item with `id` to its original path.
    pub fn restore(&self, id: Uuid) -> Result<TrashRecord> {
        let _guard = self.op_lock.lock();

        let record = self
            .journal
            .find(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        // Occupied original path (even by a dangling symlink) is a conflict;
        // the trashed item stays untouched and the caller decides.
        if fs::symlink_metadata(&record.original_path).is_ok() {
            return Err(Error::RestoreConflict(record.original_path.clone()));
        }
        match record.original_path.parent() {
            Some(parent) if parent.is_dir() => {}
            Some(parent) => {
                return Err(Error::DestinationUnavailable(parent.to_path_buf()));
            }
            None => {
                return Err(Error::DestinationUnavailable(record.original_path.clone()));
            }
        }

        // Move back first; only a verifiably restored file may lose its
        // journal entry. A crash after the move leaves a stale record that
        // recover() drops on the next startup.
        move_entry(&record.stored_path, &record.original_path)
            .map_err(|e| Error::from_io(e, &record.stored_path))?;
        self.journal.remove(id)?;

        info!(id = %id, path = %record.original_path.display(), "restored");
        Ok(record)
    }

    /// Permanently remove the stored copy of `id`, then its journal entry.
    pub fn purge(&self, id: Uuid) -> Result<TrashRecord> {
        let _guard = self.op_lock.lock();

        let record = self
            .journal
            .find(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        // Remove the copy first: the journal entry is the only memory that
        // the copy might exist, so it must outlive the copy. A copy that is
        // already gone leaves nothing to do but drop the record.
        match remove_entry(&record.stored_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(id = %id, "stored copy already gone, dropping record");
            }
            Err(e) => return Err(Error::from_io(e, &record.stored_path)),
        }
        self.journal.remove(id)?;

        info!(id = %id, "purged");
        Ok(record)
    }

    /// Reconcile the journal with the filesystem after a possible crash.
    ///
    /// For each record: the stored copy existing confirms Trashed; only the
    /// original existing means the soft delete never completed (drop the
    /// record, the original is intact); neither existing is irrecoverable
    /// (drop, logged).
    fn recover(&self) -> Result<()> {
        let records = self.journal.snapshot();
        let mut kept = Vec::with_capacity(records.len());
        let mut dropped = 0usize;

        for record in records {
            if record.stored_path.symlink_metadata().is_ok() {
                kept.push(record);
            } else if record.original_path.symlink_metadata().is_ok() {
                warn!(
                    id = %record.id,
                    path = %record.original_path.display(),
                    "soft delete never completed, original intact; dropping record"
                );
                dropped += 1;
            } else {
                warn!(
                    id = %record.id,
                    path = %record.original_path.display(),
                    "neither original nor stored copy exists; dropping record"
                );
                dropped += 1;
            }
        }

        if dropped > 0 {
            info!(dropped, kept = kept.len(), "journal recovery complete");
            self.journal.replace_all(kept)?;
        }
        Ok(())
    }
}

/// Move an entry, falling back to copy+remove for regular files when the
/// rename crosses a filesystem boundary.
fn move_entry(from: &Path, to: &Path) -> std::io::Result<()> {
    match with_fd_backoff(|| fs::rename(from, to)) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            let meta = fs::symlink_metadata(from)?;
            if !meta.is_file() {
                return Err(e);
            }
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// EXDEV — rename across mount points.
fn is_cross_device(err: &std::io::Error) -> bool {
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(18)
    }
    #[cfg(not(unix))]
    {
        let _ = err;
        false
    }
}

fn remove_entry(path: &Path) -> std::io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
