//! Backup Manager
//!
//! Bounds the number of snapshots in flight and hands out versioned
//! backup file names.
//!
//! ## Responsibilities
//! - Block BACKUP callers while K snapshots are already in flight
//! - Allocate `<base>-<version>` names without ever overwriting a file
//! - Take a consistent copy of the store and write it in the background
//! - Track in-flight, peak, completed and failed snapshot counts

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::store::KvStore;

use super::snapshot::{backup_path, parse_backup_version, write_snapshot, SnapshotWriter};

/// Slot accounting, guarded by `Slots::state`
#[derive(Debug, Default)]
struct SlotCounts {
    in_flight: usize,
    peak: usize,
}

/// State shared with the background snapshot threads
struct Slots {
    max_in_flight: usize,
    state: Mutex<SlotCounts>,
    freed: Condvar,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl Slots {
    /// Block until a slot is free, then take it
    fn acquire(self: &Arc<Self>) -> SlotGuard {
        let mut state = self.state.lock();
        while state.in_flight >= self.max_in_flight {
            debug!(
                "Backup slots exhausted ({}/{}), waiting",
                state.in_flight, self.max_in_flight
            );
            self.freed.wait(&mut state);
        }

        state.in_flight += 1;
        state.peak = state.peak.max(state.in_flight);

        SlotGuard {
            slots: Arc::clone(self),
        }
    }
}

/// One taken backup slot; released on drop, whatever the snapshot outcome
struct SlotGuard {
    slots: Arc<Slots>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut state = self.slots.state.lock();
        state.in_flight -= 1;
        drop(state);
        self.slots.freed.notify_one();
    }
}

/// Coordinates every BACKUP issued by any worker
///
/// ## Concurrency:
/// - `slots`: own Mutex + Condvar, independent of the store lock
/// - `next_version`: naming lock; existence check and file creation happen
///   together under it, and `create_new` refuses to clobber a file that
///   appeared behind our back
/// - `workers`: join handles of background snapshot writers; finished ones
///   are joined whenever a new writer starts
pub struct BackupManager {
    slots: Arc<Slots>,

    /// Body of every snapshot
    writer: SnapshotWriter,

    /// Backup file extension (without the dot)
    extension: String,

    /// Lowest version worth probing next, per (directory, base name)
    next_version: Mutex<HashMap<PathBuf, u64>>,

    /// Background snapshot writers not yet joined
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl BackupManager {
    /// Create a manager allowing at most `max_in_flight` concurrent snapshots
    pub fn new(max_in_flight: usize, extension: impl Into<String>) -> Self {
        Self {
            slots: Arc::new(Slots {
                max_in_flight: max_in_flight.max(1),
                state: Mutex::new(SlotCounts::default()),
                freed: Condvar::new(),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
            writer: Arc::new(write_snapshot),
            extension: extension.into(),
            next_version: Mutex::new(HashMap::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Replace the function that writes each snapshot body
    pub fn with_writer(mut self, writer: SnapshotWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Snapshot the store into the next free `<base>-<version>` file in `dir`
    ///
    /// Steps:
    /// 1. Wait for a free slot (never rejects)
    /// 2. Copy the store under its exclusive lock
    /// 3. Claim the next version number and create its file
    /// 4. Write the copy on a background thread that holds the slot
    ///
    /// A snapshot that fails to start or to write is removed from disk.
    /// Its version is not handed out again.
    ///
    /// Returns the path of the backup being written.
    pub fn backup(&self, store: &KvStore, dir: &Path, base: &str) -> Result<PathBuf> {
        // Step 1: Take a slot; dropping it on any error below frees it again
        let slot = self.slots.acquire();

        // Step 2: Point-in-time copy of the store
        let entries = store.dump()?;

        // Step 3: Name and create the file
        let (path, file) = self.create_backup_file(dir, base)?;
        info!(
            "Backup {} started ({} entries)",
            path.display(),
            entries.len()
        );

        // Step 4: Write in the background
        let slots = Arc::clone(&self.slots);
        let writer = Arc::clone(&self.writer);
        let thread_path = path.clone();
        let spawned = thread::Builder::new()
            .name("jobkv-backup".to_string())
            .spawn(move || {
                let _slot = slot;
                match writer(file, &entries) {
                    Ok(()) => {
                        slots.completed.fetch_add(1, Ordering::SeqCst);
                        info!("Backup {} written", thread_path.display());
                    }
                    Err(e) => {
                        slots.failed.fetch_add(1, Ordering::SeqCst);
                        error!("Failed to write backup {}: {}", thread_path.display(), e);
                        remove_incomplete(&thread_path);
                    }
                }
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to start backup writer for {}: {}", path.display(), e);
                remove_incomplete(&path);
                return Err(e.into());
            }
        };

        self.track(handle);
        Ok(path)
    }

    /// Wait for every background snapshot started so far
    pub fn wait_all(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            self.join_writer(handle);
        }
    }

    /// Versions of `base` already present in `dir`, ascending
    pub fn existing_versions(&self, dir: &Path, base: &str) -> Result<Vec<u64>> {
        let mut versions = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(version) = entry
                .file_name()
                .to_str()
                .and_then(|name| parse_backup_version(name, base, &self.extension))
            {
                versions.push(version);
            }
        }

        versions.sort_unstable();
        Ok(versions)
    }

    // =========================================================================
    // Accessors (for testing and reporting)
    // =========================================================================

    /// Configured slot limit (K)
    pub fn max_in_flight(&self) -> usize {
        self.slots.max_in_flight
    }

    /// Snapshots currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.slots.state.lock().in_flight
    }

    /// Highest number of snapshots ever in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.slots.state.lock().peak
    }

    /// Writer threads started but not yet joined
    pub fn pending_writers(&self) -> usize {
        self.workers.lock().len()
    }

    /// Snapshots written successfully
    pub fn completed(&self) -> u64 {
        self.slots.completed.load(Ordering::SeqCst)
    }

    /// Snapshots that failed while writing
    pub fn failed(&self) -> u64 {
        self.slots.failed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Remember a new writer, joining any that already finished
    fn track(&self, handle: JoinHandle<()>) {
        let finished: Vec<_> = {
            let mut workers = self.workers.lock();
            let (finished, running): (Vec<_>, Vec<_>) =
                workers.drain(..).partition(|h| h.is_finished());
            *workers = running;
            workers.push(handle);
            finished
        };

        for handle in finished {
            self.join_writer(handle);
        }
    }

    fn join_writer(&self, handle: JoinHandle<()>) {
        if handle.join().is_err() {
            self.slots.failed.fetch_add(1, Ordering::SeqCst);
            error!("Backup thread panicked");
        }
    }

    /// Claim the smallest free version at or above the last one handed out
    fn create_backup_file(&self, dir: &Path, base: &str) -> Result<(PathBuf, File)> {
        let mut next_version = self.next_version.lock();
        let hint = next_version.entry(dir.join(base)).or_insert(1);

        let mut version = *hint;
        loop {
            let path = backup_path(dir, base, version, &self.extension);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    *hint = version + 1;
                    debug!("Allocated backup version {} for {}", version, base);
                    return Ok((path, file));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    version += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Delete a backup file whose snapshot never completed
fn remove_incomplete(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => warn!("Removed incomplete backup {}", path.display()),
        Err(e) => error!("Failed to remove incomplete backup {}: {}", path.display(), e),
    }
}

impl Drop for BackupManager {
    fn drop(&mut self) {
        self.wait_all();
    }
}
