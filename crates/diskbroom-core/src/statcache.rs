/// Bounded, short-lived metadata cache.
///
/// Memoises `symlink_metadata` lookups within one scan pass to avoid
/// redundant stat calls (tree scan followed by flat scan, or back-to-back
/// directory listings). Entries carry the mtime observed at insertion so a
/// caller holding fresher knowledge (e.g. a watch event) can invalidate
/// them; the cache never grows past its capacity — on overflow the whole
/// map is cleared rather than evicting incrementally, trading a cold pass
/// for zero eviction bookkeeping.
use std::collections::HashMap;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::debug;

use crate::model::EntryKind;

/// Default number of cached entries.
pub const DEFAULT_CAPACITY: usize = 16_384;

/// Cached subset of an entry's metadata.
#[derive(Debug, Clone, Copy)]
pub struct EntryMeta {
    pub kind: EntryKind,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl EntryMeta {
    pub fn of(meta: &Metadata) -> Self {
        Self {
            kind: EntryKind::of(meta.file_type()),
            len: meta.len(),
            modified: meta.modified().ok(),
        }
    }
}

/// Fixed-capacity map from path to [`EntryMeta`].
#[derive(Debug)]
pub struct StatCache {
    capacity: usize,
    entries: Mutex<HashMap<PathBuf, EntryMeta>>,
}

impl Default for StatCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StatCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached metadata for `path`, if present. No syscall.
    pub fn get(&self, path: &Path) -> Option<EntryMeta> {
        self.entries.lock().get(path).copied()
    }

    /// Insert metadata for `path`, clearing the whole cache first if it
    /// is at capacity.
    pub fn put(&self, path: PathBuf, meta: EntryMeta) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&path) {
            debug!(capacity = self.capacity, "stat cache full, clearing");
            entries.clear();
        }
        entries.insert(path, meta);
    }

    /// Cached lookup falling back to a real `symlink_metadata` call.
    pub fn stat(&self, path: &Path) -> io::Result<EntryMeta> {
        if let Some(meta) = self.get(path) {
            return Ok(meta);
        }
        let meta = EntryMeta::of(&std::fs::symlink_metadata(path)?);
        self.put(path.to_path_buf(), meta);
        Ok(meta)
    }

    /// Drop the entry for `path` if its cached mtime differs from
    /// `current_mtime` (or unconditionally when `current_mtime` is `None`).
    pub fn invalidate(&self, path: &Path, current_mtime: Option<SystemTime>) {
        let mut entries = self.entries.lock();
        match (entries.get(path), current_mtime) {
            (Some(cached), Some(mtime)) if cached.modified == Some(mtime) => {}
            (Some(_), _) => {
                entries.remove(path);
            }
            (None, _) => {}
        }
    }

    /// Drop everything. Called when a fresh scan pass begins.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn meta(len: u64, mtime_secs: u64) -> EntryMeta {
        EntryMeta {
            kind: EntryKind::File,
            len,
            modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(mtime_secs)),
        }
    }

    #[test]
    fn get_after_put_round_trips() {
        let cache = StatCache::new(4);
        cache.put(PathBuf::from("/a"), meta(10, 1));
        let hit = cache.get(Path::new("/a")).expect("cached");
        assert_eq!(hit.len, 10);
        assert!(cache.get(Path::new("/b")).is_none());
    }

    #[test]
    fn overflow_clears_entire_cache() {
        let cache = StatCache::new(2);
        cache.put(PathBuf::from("/a"), meta(1, 1));
        cache.put(PathBuf::from("/b"), meta(2, 1));
        assert_eq!(cache.len(), 2);

        cache.put(PathBuf::from("/c"), meta(3, 1));
        // Clear-on-overflow: only the newly inserted entry survives.
        assert_eq!(cache.len(), 1);
        assert!(cache.get(Path::new("/c")).is_some());
        assert!(cache.get(Path::new("/a")).is_none());
    }

    #[test]
    fn reinserting_existing_key_does_not_clear() {
        let cache = StatCache::new(2);
        cache.put(PathBuf::from("/a"), meta(1, 1));
        cache.put(PathBuf::from("/b"), meta(2, 1));
        cache.put(PathBuf::from("/a"), meta(9, 2));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(Path::new("/a")).unwrap().len, 9);
    }

    #[test]
    fn invalidate_on_mtime_change_only() {
        let cache = StatCache::new(4);
        cache.put(PathBuf::from("/a"), meta(1, 100));

        // Same mtime: entry survives.
        cache.invalidate(
            Path::new("/a"),
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(100)),
        );
        assert!(cache.get(Path::new("/a")).is_some());

        // Changed mtime: entry dropped.
        cache.invalidate(
            Path::new("/a"),
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(101)),
        );
        assert!(cache.get(Path::new("/a")).is_none());
    }

    #[test]
    fn stat_populates_from_filesystem() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("f.txt");
        std::fs::write(&file, b"hello").unwrap();

        let cache = StatCache::new(4);
        let first = cache.stat(&file).unwrap();
        assert_eq!(first.len, 5);
        assert_eq!(first.kind, EntryKind::File);

        // Second lookup is served from the cache even if the file changed.
        std::fs::write(&file, b"longer contents").unwrap();
        let second = cache.stat(&file).unwrap();
        assert_eq!(second.len, 5);
    }
}
