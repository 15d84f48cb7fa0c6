//! Snapshot files
//!
//! Naming and writing of versioned backup files.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::protocol::write_entries;
use crate::store::Entry;

/// Writes the body of one snapshot into its freshly created file
///
/// Runs on the background thread that holds the snapshot's slot.
pub type SnapshotWriter = Arc<dyn Fn(File, &[Entry]) -> io::Result<()> + Send + Sync>;

/// File name of a backup: `<base>-<version>.<ext>`
pub fn backup_file_name(base: &str, version: u64, extension: &str) -> String {
    format!("{}-{}.{}", base, version, extension)
}

/// Full path of a backup inside `dir`
pub fn backup_path(dir: &Path, base: &str, version: u64, extension: &str) -> PathBuf {
    dir.join(backup_file_name(base, version, extension))
}

/// Parse the version out of a backup file name
/// "job-3.bck" with base "job" → Some(3)
pub fn parse_backup_version(file_name: &str, base: &str, extension: &str) -> Option<u64> {
    let stem = file_name
        .strip_suffix(extension)?
        .strip_suffix('.')?;
    let version = stem.strip_prefix(base)?.strip_prefix('-')?;

    // Reject "+3", "03" and friends so every version has exactly one name
    if version.is_empty() || version.starts_with('0') || !version.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    version.parse().ok().filter(|&v| v > 0)
}

/// Write every entry to a freshly created backup file and sync it
pub fn write_snapshot(file: File, entries: &[Entry]) -> io::Result<()> {
    let mut writer = BufWriter::new(file);
    write_entries(&mut writer, entries)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}
