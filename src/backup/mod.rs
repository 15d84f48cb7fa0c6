//! Backup Module
//!
//! Point-in-time snapshots of the store, written as plain text files.
//!
//! ## Responsibilities
//! - At most K snapshots in flight; extra BACKUP commands wait for a slot
//! - Each snapshot reflects one atomic state of the store
//! - Versioned file names that are never reused or overwritten
//!
//! ## File Format
//! ```text
//! {job_dir}/{base}-{version}.bck
//!   (key, value)
//!   (key2, value2)
//!   ...            one line per entry, unordered
//! ```

mod manager;
mod snapshot;

pub use manager::BackupManager;
pub use snapshot::{
    backup_file_name, backup_path, parse_backup_version, write_snapshot, SnapshotWriter,
};
