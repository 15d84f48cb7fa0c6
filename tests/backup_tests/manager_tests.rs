//! Tests for BackupManager
//!
//! These tests verify:
//! - Versioned naming (`<base>-<n>.bck`), never reusing or overwriting
//! - Snapshot contents equal the store at the time of the BACKUP
//! - The in-flight bound K under concurrent load, observed inside the writer
//! - Failure paths release their slot and leave no backup file behind

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use jobkv::backup::{backup_file_name, write_snapshot, BackupManager, SnapshotWriter};
use jobkv::store::{Entry, KvStore};
use jobkv::KvsError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn store_with(items: &[(&str, &str)]) -> KvStore {
    let store = KvStore::open().unwrap();
    let pairs: Vec<_> = items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    store.write(&pairs).unwrap();
    store
}

fn lines_of(path: &Path) -> HashSet<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Concurrent executions of the snapshot body, counted by the body itself
#[derive(Default)]
struct WriterOccupancy {
    current: AtomicUsize,
    peak: AtomicUsize,
}

fn counting_writer(occupancy: Arc<WriterOccupancy>) -> SnapshotWriter {
    Arc::new(move |file: File, entries: &[Entry]| {
        let now = occupancy.current.fetch_add(1, Ordering::SeqCst) + 1;
        occupancy.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        let result = write_snapshot(file, entries);
        occupancy.current.fetch_sub(1, Ordering::SeqCst);
        result
    })
}

fn failing_writer() -> SnapshotWriter {
    Arc::new(|mut file: File, _entries: &[Entry]| -> io::Result<()> {
        file.write_all(b"(a, 1")?;
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    })
}

// =============================================================================
// Naming Tests
// =============================================================================

#[test]
fn test_first_backup_is_version_one() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&[("a", "1"), ("b", "2")]);
    let manager = BackupManager::new(1, "bck");

    let path = manager.backup(&store, dir.path(), "job").unwrap();
    manager.wait_all();

    assert_eq!(path, dir.path().join("job-1.bck"));
    let expected: HashSet<String> = ["(a, 1)", "(b, 2)"].iter().map(|s| s.to_string()).collect();
    assert_eq!(lines_of(&path), expected);
    assert_eq!(manager.completed(), 1);
    assert_eq!(manager.failed(), 0);
}

#[test]
fn test_versions_increase_by_one() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&[("a", "1")]);
    let manager = BackupManager::new(2, "bck");

    for expected in 1..=3 {
        let path = manager.backup(&store, dir.path(), "job").unwrap();
        assert_eq!(path, dir.path().join(backup_file_name("job", expected, "bck")));
    }
    manager.wait_all();

    assert_eq!(manager.existing_versions(dir.path(), "job").unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_versions_are_per_base_name() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&[("a", "1")]);
    let manager = BackupManager::new(2, "bck");

    manager.backup(&store, dir.path(), "x").unwrap();
    manager.backup(&store, dir.path(), "y").unwrap();
    manager.backup(&store, dir.path(), "x").unwrap();
    manager.wait_all();

    assert_eq!(manager.existing_versions(dir.path(), "x").unwrap(), vec![1, 2]);
    assert_eq!(manager.existing_versions(dir.path(), "y").unwrap(), vec![1]);
}

#[test]
fn test_existing_backup_is_never_overwritten() {
    let dir = TempDir::new().unwrap();
    let existing = dir.path().join("job-1.bck");
    fs::write(&existing, "(old, data)\n").unwrap();

    let store = store_with(&[("new", "data")]);
    let manager = BackupManager::new(1, "bck");

    let path = manager.backup(&store, dir.path(), "job").unwrap();
    manager.wait_all();

    assert_eq!(path, dir.path().join("job-2.bck"));
    assert_eq!(fs::read_to_string(&existing).unwrap(), "(old, data)\n");
}

#[test]
fn test_concurrent_backups_get_distinct_versions() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&[("a", "1")]);
    let manager = BackupManager::new(3, "bck");

    let paths = crossbeam::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (store, manager, dir) = (&store, &manager, dir.path());
                s.spawn(move |_| manager.backup(store, dir, "job").unwrap())
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    })
    .unwrap();
    manager.wait_all();

    let unique: HashSet<_> = paths.iter().collect();
    assert_eq!(unique.len(), 8);
    assert_eq!(
        manager.existing_versions(dir.path(), "job").unwrap(),
        (1..=8).collect::<Vec<u64>>()
    );
}

// =============================================================================
// Snapshot Semantics Tests
// =============================================================================

#[test]
fn test_snapshot_reflects_state_at_backup_time() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&[("a", "1")]);
    let manager = BackupManager::new(1, "bck");

    let path = manager.backup(&store, dir.path(), "job").unwrap();
    store
        .write(&[("b".to_string(), "2".to_string())])
        .unwrap();
    store.delete(&["a".to_string()]).unwrap();
    manager.wait_all();

    let expected: HashSet<String> = ["(a, 1)".to_string()].into_iter().collect();
    assert_eq!(lines_of(&path), expected);
}

#[test]
fn test_backup_of_empty_store_is_empty_file() {
    let dir = TempDir::new().unwrap();
    let store = KvStore::open().unwrap();
    let manager = BackupManager::new(1, "bck");

    let path = manager.backup(&store, dir.path(), "job").unwrap();
    manager.wait_all();

    assert_eq!(fs::read_to_string(path).unwrap(), "");
}

// =============================================================================
// Slot Bound Tests
// =============================================================================

#[test]
fn test_in_flight_never_exceeds_limit() {
    let dir = TempDir::new().unwrap();
    let items: Vec<(String, String)> = (0..2000)
        .map(|i| (format!("key{}", i), format!("value{}", i)))
        .collect();
    let store = KvStore::open().unwrap();
    store.write(&items).unwrap();
    let manager = BackupManager::new(2, "bck");

    crossbeam::thread::scope(|s| {
        for t in 0..6 {
            let (store, manager, dir) = (&store, &manager, dir.path());
            s.spawn(move |_| {
                for _ in 0..5 {
                    manager.backup(store, dir, &format!("job{}", t)).unwrap();
                    assert!(manager.in_flight() <= 2);
                }
            });
        }
    })
    .unwrap();
    manager.wait_all();

    assert!(manager.peak_in_flight() <= 2);
    assert!(manager.peak_in_flight() >= 1);
    assert_eq!(manager.completed(), 30);
    assert_eq!(manager.in_flight(), 0);
}

#[test]
fn test_concurrent_writers_never_exceed_limit() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&[("a", "1"), ("b", "2")]);
    let occupancy = Arc::new(WriterOccupancy::default());
    let manager =
        BackupManager::new(2, "bck").with_writer(counting_writer(Arc::clone(&occupancy)));

    crossbeam::thread::scope(|s| {
        for t in 0..6 {
            let (store, manager, dir) = (&store, &manager, dir.path());
            s.spawn(move |_| {
                for _ in 0..3 {
                    manager.backup(store, dir, &format!("job{}", t)).unwrap();
                }
            });
        }
    })
    .unwrap();
    manager.wait_all();

    let peak = occupancy.peak.load(Ordering::SeqCst);
    assert!(peak <= 2, "{} snapshot writers ran at once", peak);
    assert!(peak >= 1);
    assert_eq!(occupancy.current.load(Ordering::SeqCst), 0);
    assert_eq!(manager.completed(), 18);
}

#[test]
fn test_backup_waits_for_running_writer() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&[("a", "1")]);
    let (release, gate) = crossbeam::channel::unbounded::<()>();
    let writer: SnapshotWriter = Arc::new(move |file: File, entries: &[Entry]| {
        let _ = gate.recv();
        write_snapshot(file, entries)
    });
    let manager = BackupManager::new(1, "bck").with_writer(writer);

    // The first writer stays blocked on the gate while holding the only slot
    manager.backup(&store, dir.path(), "job").unwrap();

    let second_started = AtomicBool::new(false);
    crossbeam::thread::scope(|s| {
        let (store, manager, dir, flag) = (&store, &manager, dir.path(), &second_started);
        let second = s.spawn(move |_| {
            manager.backup(store, dir, "job").unwrap();
            flag.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(100));
        let started_early = second_started.load(Ordering::SeqCst);
        let in_flight = manager.in_flight();

        release.send(()).unwrap();
        release.send(()).unwrap();
        second.join().unwrap();

        assert!(!started_early, "second backup ran while the slot was held");
        assert_eq!(in_flight, 1);
    })
    .unwrap();
    manager.wait_all();

    assert!(second_started.load(Ordering::SeqCst));
    assert_eq!(manager.completed(), 2);
    assert_eq!(manager.existing_versions(dir.path(), "job").unwrap(), vec![1, 2]);
}

#[test]
fn test_single_slot_serializes_backups() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&[("a", "1")]);
    let manager = BackupManager::new(1, "bck");

    for _ in 0..4 {
        manager.backup(&store, dir.path(), "job").unwrap();
    }
    manager.wait_all();

    assert_eq!(manager.max_in_flight(), 1);
    assert_eq!(manager.peak_in_flight(), 1);
    assert_eq!(manager.completed(), 4);
}

#[test]
fn test_failed_backup_releases_slot() {
    let dir = TempDir::new().unwrap();
    let store = KvStore::new();
    let manager = BackupManager::new(1, "bck");

    let result = manager.backup(&store, dir.path(), "job");
    assert!(matches!(result, Err(KvsError::NotInitialized)));
    assert_eq!(manager.in_flight(), 0);
    assert!(manager.existing_versions(dir.path(), "job").unwrap().is_empty());

    // The slot is usable again
    store.init().unwrap();
    manager.backup(&store, dir.path(), "job").unwrap();
    manager.wait_all();
    assert_eq!(manager.completed(), 1);
}

#[test]
fn test_failed_write_leaves_no_backup_file() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&[("a", "1")]);
    let manager = BackupManager::new(1, "bck").with_writer(failing_writer());

    let path = manager.backup(&store, dir.path(), "job").unwrap();
    manager.wait_all();

    assert!(!path.exists());
    assert!(manager.existing_versions(dir.path(), "job").unwrap().is_empty());
    assert_eq!(manager.failed(), 1);
    assert_eq!(manager.completed(), 0);
    assert_eq!(manager.in_flight(), 0);
}

#[test]
fn test_version_after_failed_write_is_not_reused() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&[("a", "1")]);

    let failing = BackupManager::new(1, "bck").with_writer(failing_writer());
    failing.backup(&store, dir.path(), "job").unwrap();
    failing.wait_all();
    let path = failing.backup(&store, dir.path(), "job").unwrap();
    failing.wait_all();

    assert_eq!(path, dir.path().join("job-2.bck"));
    assert!(!path.exists());
}

#[test]
fn test_finished_writers_are_joined() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&[("a", "1")]);
    let manager = BackupManager::new(1, "bck");

    for round in 1..=5u64 {
        manager.backup(&store, dir.path(), "job").unwrap();
        assert_eq!(manager.pending_writers(), 1);

        while manager.completed() < round {
            thread::sleep(Duration::from_millis(5));
        }
        // Let the writer thread exit after reporting
        thread::sleep(Duration::from_millis(50));
    }

    manager.wait_all();
    assert_eq!(manager.pending_writers(), 0);
    assert_eq!(manager.completed(), 5);
}

#[test]
fn test_backup_into_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&[("a", "1")]);
    let manager = BackupManager::new(1, "bck");

    let result = manager.backup(&store, &dir.path().join("gone"), "job");
    assert!(matches!(result, Err(KvsError::Io(_))));
    assert_eq!(manager.in_flight(), 0);
}
