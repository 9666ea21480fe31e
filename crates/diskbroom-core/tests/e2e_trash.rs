/// End-to-end trash lifecycle tests.
///
/// These run the full soft-delete → restore / purge lifecycle against a
/// real temporary filesystem, including manager restarts in between, so
/// the journal's durability and the startup recovery pass are exercised
/// exactly as they would be across real process lifetimes.
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use diskbroom_core::trash::TrashManager;
use diskbroom_core::Error;

fn write_bytes(path: &Path, contents: &[u8]) {
    fs::write(path, contents).unwrap();
}

/// Soft-delete then restore is an identity: same bytes, same path, and no
/// journal entry remains — even across a manager restart in between.
#[test]
fn delete_restart_restore_is_identity() {
    let tmp = TempDir::new().unwrap();
    let trash_dir = tmp.path().join("trash");
    let victim = tmp.path().join("report.pdf");
    write_bytes(&victim, b"quarterly numbers");

    let id = {
        let manager = TrashManager::open(trash_dir.clone()).unwrap();
        let record = manager.soft_delete(&victim).unwrap();
        assert!(!victim.exists());
        record.id
    };

    // A new process: the journal is reloaded from disk.
    let manager = TrashManager::open(trash_dir).unwrap();
    assert_eq!(manager.list().len(), 1, "record survives restart");
    manager.restore(id).unwrap();

    assert_eq!(fs::read(&victim).unwrap(), b"quarterly numbers");
    assert!(manager.list().is_empty());
}

/// Soft-delete then purge removes the stored copy and the record; the
/// original path stays empty.
#[test]
fn delete_then_purge_leaves_nothing() {
    let tmp = TempDir::new().unwrap();
    let manager = TrashManager::open(tmp.path().join("trash")).unwrap();
    let victim = tmp.path().join("junk.tmp");
    write_bytes(&victim, b"x");

    let record = manager.soft_delete(&victim).unwrap();
    manager.purge(record.id).unwrap();

    assert!(!victim.exists());
    assert!(!record.stored_path.exists());
    assert!(manager.list().is_empty());
    // And the id is no longer a valid handle.
    assert!(matches!(manager.restore(record.id), Err(Error::NotFound(_))));
}

/// Several items in the trash at once: each id is an independent handle
/// and operations on one never disturb the others.
#[test]
fn multiple_items_are_independent() {
    let tmp = TempDir::new().unwrap();
    let manager = TrashManager::open(tmp.path().join("trash")).unwrap();

    let a = tmp.path().join("a.txt");
    let b = tmp.path().join("b.txt");
    let c = tmp.path().join("c.txt");
    for (path, contents) in [(&a, b"aaa"), (&b, b"bbb"), (&c, b"ccc")] {
        write_bytes(path, contents);
    }

    let rec_a = manager.soft_delete(&a).unwrap();
    let rec_b = manager.soft_delete(&b).unwrap();
    let rec_c = manager.soft_delete(&c).unwrap();
    assert_eq!(manager.list().len(), 3);

    manager.purge(rec_b.id).unwrap();
    manager.restore(rec_a.id).unwrap();

    assert_eq!(fs::read(&a).unwrap(), b"aaa");
    assert!(!b.exists());
    let remaining = manager.list();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, rec_c.id);
}

/// A directory round-trips through the trash with its contents intact.
#[test]
fn directory_round_trips_with_contents() {
    let tmp = TempDir::new().unwrap();
    let manager = TrashManager::open(tmp.path().join("trash")).unwrap();

    let project = tmp.path().join("project");
    fs::create_dir_all(project.join("src")).unwrap();
    write_bytes(&project.join("src/main.c"), b"int main(void){}");
    write_bytes(&project.join("README"), b"hi");

    let record = manager.soft_delete(&project).unwrap();
    assert!(!project.exists());

    manager.restore(record.id).unwrap();
    assert_eq!(fs::read(project.join("src/main.c")).unwrap(), b"int main(void){}");
    assert_eq!(fs::read(project.join("README")).unwrap(), b"hi");
}

/// Simulated crash between journal append and move: on the next startup
/// the item must be fully Active again — the original intact, the journal
/// empty — never unreachable at both locations.
#[test]
fn crash_before_move_recovers_to_active() {
    let tmp = TempDir::new().unwrap();
    let trash_dir = tmp.path().join("trash");
    let victim = tmp.path().join("doc.txt");
    write_bytes(&victim, b"untouched");

    // Write the journal exactly as a crashed soft-delete leaves it: a
    // record exists, the stored copy does not, the original is in place.
    {
        let manager = TrashManager::open(trash_dir.clone()).unwrap();
        let record = manager.soft_delete(&victim).unwrap();
        // Undo the move but leave the journal entry, simulating the crash
        // window between the append and the rename.
        fs::rename(&record.stored_path, &victim).unwrap();
    }

    let manager = TrashManager::open(trash_dir).unwrap();
    assert!(manager.list().is_empty(), "stale record must be dropped");
    assert_eq!(fs::read(&victim).unwrap(), b"untouched");
}

/// Crash after the move is the consistent case: the record and the stored
/// copy both exist, so the item stays Trashed and restorable.
#[test]
fn crash_after_move_stays_trashed() {
    let tmp = TempDir::new().unwrap();
    let trash_dir = tmp.path().join("trash");
    let victim = tmp.path().join("doc.txt");
    write_bytes(&victim, b"safe");

    let id = {
        let manager = TrashManager::open(trash_dir.clone()).unwrap();
        manager.soft_delete(&victim).unwrap().id
        // Manager dropped here without restore/purge: same journal state
        // as a crash right after the move completed.
    };

    let manager = TrashManager::open(trash_dir).unwrap();
    assert_eq!(manager.list().len(), 1);
    manager.restore(id).unwrap();
    assert_eq!(fs::read(&victim).unwrap(), b"safe");
}

/// Restore into an occupied original path fails with a conflict and leaves
/// both the new occupant and the trashed item intact.
#[test]
fn restore_conflict_preserves_both_sides() {
    let tmp = TempDir::new().unwrap();
    let manager = TrashManager::open(tmp.path().join("trash")).unwrap();
    let path = tmp.path().join("notes.txt");
    write_bytes(&path, b"version one");

    let record = manager.soft_delete(&path).unwrap();
    write_bytes(&path, b"version two");

    assert!(matches!(
        manager.restore(record.id),
        Err(Error::RestoreConflict(_))
    ));
    assert_eq!(fs::read(&path).unwrap(), b"version two");
    assert_eq!(fs::read(&record.stored_path).unwrap(), b"version one");
    assert_eq!(manager.list().len(), 1, "item is still restorable");
}

/// The journal file itself never collides with stored copies, and every
/// stored copy keeps the original basename for identifiability.
#[test]
fn storage_layout_is_identifiable() {
    let tmp = TempDir::new().unwrap();
    let trash_dir = tmp.path().join("trash");
    let manager = TrashManager::open(trash_dir.clone()).unwrap();

    let victim = tmp.path().join("holiday.jpg");
    write_bytes(&victim, b"pixels");
    let record = manager.soft_delete(&victim).unwrap();

    assert_eq!(record.stored_path.parent().unwrap(), trash_dir);
    let stored_name = record.stored_path.file_name().unwrap().to_string_lossy();
    assert!(stored_name.starts_with(&record.id.to_string()));
    assert!(stored_name.ends_with("-holiday.jpg"));
    assert!(trash_dir.join("manifest.json").exists());
}
