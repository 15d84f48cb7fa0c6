//! KvStore implementation
//!
//! HashMap-based table behind one parking_lot RwLock.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{KvsError, Result};
use super::Entry;

/// The shared key-value table
///
/// ## Concurrency Model
///
/// One reader/writer lock guards the whole map:
/// - `read`, `show`: shared mode, many concurrent callers
/// - `write`, `delete`, `dump`: exclusive mode
///
/// Every method holds the lock for the entire batch, so no caller ever
/// observes a partially applied `write` or `delete`. parking_lot's RwLock
/// is eventually fair, so a steady stream of readers cannot starve a writer.
///
/// ## Lifecycle
///
/// `None` means "no table": before `init()` and after `terminate()` every
/// operation fails with `NotInitialized`.
pub struct KvStore {
    table: RwLock<Option<HashMap<String, String>>>,
}

impl KvStore {
    /// Create a store with no table allocated yet
    pub fn new() -> Self {
        Self {
            table: RwLock::new(None),
        }
    }

    /// Create and initialize a store in one step
    pub fn open() -> Result<Self> {
        let store = Self::new();
        store.init()?;
        Ok(store)
    }

    /// Allocate the empty table
    pub fn init(&self) -> Result<()> {
        let mut table = self.table.write();
        if table.is_some() {
            return Err(KvsError::AlreadyInitialized);
        }
        *table = Some(HashMap::new());
        Ok(())
    }

    /// Release every entry and the table itself
    ///
    /// Callers must make sure no worker is still using the store.
    pub fn terminate(&self) -> Result<()> {
        let mut table = self.table.write();
        match table.take() {
            Some(_) => Ok(()),
            None => Err(KvsError::NotInitialized),
        }
    }

    /// Whether a table is currently allocated
    pub fn is_initialized(&self) -> bool {
        self.table.read().is_some()
    }

    /// Upsert every pair, in order (exclusive lock)
    ///
    /// A key repeated within the batch ends up with its last value.
    pub fn write(&self, pairs: &[(String, String)]) -> Result<()> {
        let mut guard = self.table.write();
        let table = guard.as_mut().ok_or(KvsError::NotInitialized)?;

        for (key, value) in pairs {
            match table.get_mut(key) {
                Some(existing) => {
                    existing.clone_from(value);
                }
                None => {
                    table.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(())
    }

    /// Look up every key, in order (shared lock)
    ///
    /// Returns one `(key, value)` per requested key; `None` marks a miss.
    pub fn read(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>> {
        let guard = self.table.read();
        let table = guard.as_ref().ok_or(KvsError::NotInitialized)?;

        Ok(keys
            .iter()
            .map(|key| (key.clone(), table.get(key).cloned()))
            .collect())
    }

    /// Remove every key that exists (exclusive lock)
    ///
    /// Returns the keys that were missing, in request order. Removed keys
    /// contribute nothing to the result.
    pub fn delete(&self, keys: &[String]) -> Result<Vec<String>> {
        let mut guard = self.table.write();
        let table = guard.as_mut().ok_or(KvsError::NotInitialized)?;

        let mut missing = Vec::new();
        for key in keys {
            if table.remove(key).is_none() {
                missing.push(key.clone());
            }
        }

        Ok(missing)
    }

    /// Copy every entry (shared lock), in unspecified order
    pub fn show(&self) -> Result<Vec<Entry>> {
        let guard = self.table.read();
        let table = guard.as_ref().ok_or(KvsError::NotInitialized)?;

        Ok(Self::collect(table))
    }

    /// Copy every entry for a backup (exclusive lock)
    ///
    /// Same contents as `show`, but taken with writers and readers shut out
    /// so the copy is one consistent state of the store.
    pub fn dump(&self) -> Result<Vec<Entry>> {
        let guard = self.table.write();
        let table = guard.as_ref().ok_or(KvsError::NotInitialized)?;

        Ok(Self::collect(table))
    }

    /// Number of entries currently stored
    pub fn len(&self) -> Result<usize> {
        let guard = self.table.read();
        guard.as_ref().map(HashMap::len).ok_or(KvsError::NotInitialized)
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn collect(table: &HashMap<String, String>) -> Vec<Entry> {
        table
            .iter()
            .map(|(key, value)| Entry::new(key.clone(), value.clone()))
            .collect()
    }
}

impl Default for KvStore {
    fn default() -> Self {
        Self::new()
    }
}
