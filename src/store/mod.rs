//! Store Module
//!
//! The shared in-memory key-value table every worker operates on.
//!
//! ## Responsibilities
//! - Unique key → value mapping with upsert/lookup/remove
//! - Multi-key batches applied atomically
//! - Point-in-time copies for SHOW and backups
//!
//! ## Data Structure Choice
//! Using HashMap wrapped in a single RwLock:
//! - O(1) average lookup/insert/delete, keys unique by construction
//! - Iteration order is unspecified and must not be relied upon
//! - One process-wide lock makes every batch atomic without per-key locking

mod table;

use std::fmt;

pub use table::KvStore;

/// Sentinel rendered for a READ of an absent key
pub const KVS_ERROR: &str = "KVSERROR";

/// Sentinel rendered for a DELETE of an absent key
pub const KVS_MISSING: &str = "KVSMISSING";

/// A stored key/value pair, copied out of the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// SHOW and backup line format
impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.key, self.value)
    }
}
