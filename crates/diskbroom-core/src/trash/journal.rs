/// Durable manifest of soft-deleted items.
///
/// The whole journal is rewritten on every mutation: serialise to a
/// temporary file, then atomically rename over the manifest. Partial
/// in-place edits never happen, so a reader (including recovery after a
/// crash) always sees either the previous or the next complete state.
///
/// Single-writer discipline: every mutation runs under the store's lock.
/// Reads copy the current snapshot and never block behind a pending write
/// for longer than the in-memory clone.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::EntryKind;

/// One soft-deleted item. Never mutated in place: restore and purge remove
/// the record entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashRecord {
    pub id: Uuid,
    pub original_path: PathBuf,
    pub stored_path: PathBuf,
    pub size_bytes: u64,
    pub kind: EntryKind,
    pub deleted_at: DateTime<Utc>,
}

/// The journal store. Exclusively owns the manifest file on disk.
#[derive(Debug)]
pub struct JournalStore {
    manifest_path: PathBuf,
    records: Mutex<Vec<TrashRecord>>,
}

impl JournalStore {
    /// Open the journal at `manifest_path`, loading any existing records.
    /// A missing manifest is an empty journal.
    pub fn open(manifest_path: PathBuf) -> Result<Self> {
        let records = match fs::read(&manifest_path) {
            Ok(bytes) => serde_json::from_slice::<Vec<TrashRecord>>(&bytes)
                .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(Error::from_io(e, &manifest_path)),
        };
        debug!(
            manifest = %manifest_path.display(),
            records = records.len(),
            "journal opened"
        );
        Ok(Self {
            manifest_path,
            records: Mutex::new(records),
        })
    }

    /// Copy-on-read snapshot of the current records, in insertion order.
    pub fn snapshot(&self) -> Vec<TrashRecord> {
        self.records.lock().clone()
    }

    /// Look up one record by id.
    pub fn find(&self, id: Uuid) -> Option<TrashRecord> {
        self.records.lock().iter().find(|r| r.id == id).cloned()
    }

    /// Append a record and durably persist the journal. On persist failure
    /// the in-memory append is rolled back, so memory and disk stay in step.
    pub fn append(&self, record: TrashRecord) -> Result<()> {
        let mut records = self.records.lock();
        records.push(record);
        if let Err(e) = persist(&self.manifest_path, &records) {
            records.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Remove the record with `id` and persist. Returns the removed record,
    /// or `None` when the id is unknown (nothing is written in that case).
    pub fn remove(&self, id: Uuid) -> Result<Option<TrashRecord>> {
        let mut records = self.records.lock();
        let position = match records.iter().position(|r| r.id == id) {
            Some(p) => p,
            None => return Ok(None),
        };
        let removed = records.remove(position);
        if let Err(e) = persist(&self.manifest_path, &records) {
            records.insert(position, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    /// Replace the whole record set (recovery) and persist.
    pub fn replace_all(&self, new_records: Vec<TrashRecord>) -> Result<()> {
        let mut records = self.records.lock();
        let previous = std::mem::replace(&mut *records, new_records);
        if let Err(e) = persist(&self.manifest_path, &records) {
            *records = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }
}

/// Write-new-then-replace: the manifest is never partially written.
fn persist(manifest_path: &Path, records: &[TrashRecord]) -> Result<()> {
    if let Some(parent) = manifest_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::from_io(e, parent))?;
    }
    let bytes = serde_json::to_vec_pretty(records)
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    let tmp_path = manifest_path.with_extension("json.tmp");
    fs::write(&tmp_path, bytes).map_err(|e| Error::from_io(e, &tmp_path))?;
    fs::rename(&tmp_path, manifest_path).map_err(|e| Error::from_io(e, manifest_path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(original: &str, stored: &str) -> TrashRecord {
        TrashRecord {
            id: Uuid::new_v4(),
            original_path: PathBuf::from(original),
            stored_path: PathBuf::from(stored),
            size_bytes: 42,
            kind: EntryKind::File,
            deleted_at: Utc::now(),
        }
    }

    #[test]
    fn append_persists_and_reloads() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("manifest.json");

        let rec = record("/home/u/doc.txt", "/trash/x-doc.txt");
        let id = rec.id;
        {
            let store = JournalStore::open(manifest.clone()).unwrap();
            store.append(rec).unwrap();
        }

        let reopened = JournalStore::open(manifest).unwrap();
        let snapshot = reopened.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(snapshot[0].original_path, PathBuf::from("/home/u/doc.txt"));
    }

    #[test]
    fn remove_persists_and_returns_record() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("manifest.json");
        let store = JournalStore::open(manifest.clone()).unwrap();

        let rec = record("/a", "/t/a");
        let id = rec.id;
        store.append(rec).unwrap();
        store.append(record("/b", "/t/b")).unwrap();

        let removed = store.remove(id).unwrap().expect("record exists");
        assert_eq!(removed.id, id);
        assert!(store.find(id).is_none());

        let reopened = JournalStore::open(manifest).unwrap();
        assert_eq!(reopened.snapshot().len(), 1);
    }

    #[test]
    fn remove_unknown_id_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JournalStore::open(tmp.path().join("manifest.json")).unwrap();
        assert!(store.remove(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn missing_manifest_is_empty_journal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JournalStore::open(tmp.path().join("nope/manifest.json")).unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn no_temp_file_left_behind_after_persist() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("manifest.json");
        let store = JournalStore::open(manifest.clone()).unwrap();
        store.append(record("/a", "/t/a")).unwrap();

        assert!(manifest.exists());
        assert!(!manifest.with_extension("json.tmp").exists());
    }

    #[test]
    fn replace_all_overwrites_records() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JournalStore::open(tmp.path().join("manifest.json")).unwrap();
        store.append(record("/a", "/t/a")).unwrap();
        store.append(record("/b", "/t/b")).unwrap();

        let kept = vec![record("/c", "/t/c")];
        store.replace_all(kept).unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].original_path, PathBuf::from("/c"));
    }
}
