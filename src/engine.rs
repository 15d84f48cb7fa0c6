//! Engine Module
//!
//! Ties the store, the backup manager and the command set together.
//!
//! ## Responsibilities
//! - Own the store for the whole run (init on open, terminate on close)
//! - Dispatch each parsed command of a job
//! - Keep per-command failures local to the command

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::backup::{write_snapshot, BackupManager, SnapshotWriter};
use crate::config::Config;
use crate::error::Result;
use crate::protocol::{write_entries, Command, DeleteResponse, ReadResponse, HELP_TEXT};
use crate::scheduler::{JobFile, RunSummary, Scheduler};
use crate::store::KvStore;

/// What the job runner should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Back to READY: parse the next line
    Continue,

    /// End of commands: the job is finished
    Done,
}

/// The storage engine shared by every worker
///
/// ## Locking
///
/// - Store: one RwLock (READ/SHOW shared; WRITE/DELETE/backup dump exclusive)
/// - Backups: own slot lock, independent of the store lock
///
/// A BACKUP takes a slot first and the store lock second, and never waits
/// for a slot while holding the store lock, so the two cannot deadlock.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// The key-value table
    store: KvStore,

    /// Bounded snapshot writer
    backups: BackupManager,
}

impl Engine {
    /// Validate the config and initialize a fresh store
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_writer(config, Arc::new(write_snapshot))
    }

    /// Like [`Engine::open`], with a custom body for every snapshot
    pub fn open_with_writer(config: Config, writer: SnapshotWriter) -> Result<Self> {
        config.validate()?;

        let store = KvStore::open()?;
        let backups = BackupManager::new(config.max_backups, config.backup_extension.clone())
            .with_writer(writer);

        debug!(
            "Engine open: {} workers, {} backup slots",
            config.max_threads, config.max_backups
        );

        Ok(Self {
            config,
            store,
            backups,
        })
    }

    /// Run every job in the configured directory
    pub fn run(&self) -> Result<RunSummary> {
        Scheduler::new(self).run()
    }

    /// Execute one command of `job`, writing any output to `out`
    ///
    /// Only failures writing `out` are returned; store and backup failures
    /// are reported and the job moves on to its next command.
    pub fn execute<W: Write>(&self, command: Command, job: &JobFile, out: &mut W) -> Result<Flow> {
        match command {
            Command::Write { pairs } => {
                if let Err(e) = self.store.write(&pairs) {
                    error!("{}: failed to write pairs: {}", job.base(), e);
                }
            }
            Command::Read { keys } => match self.store.read(&keys) {
                Ok(results) => out.write_all(ReadResponse::new(results).render().as_bytes())?,
                Err(e) => error!("{}: failed to read pairs: {}", job.base(), e),
            },
            Command::Delete { keys } => match self.store.delete(&keys) {
                Ok(missing) => {
                    if let Some(line) = DeleteResponse::new(missing).render() {
                        out.write_all(line.as_bytes())?;
                    }
                }
                Err(e) => error!("{}: failed to delete pairs: {}", job.base(), e),
            },
            Command::Show => match self.store.show() {
                Ok(entries) => write_entries(out, &entries)?,
                Err(e) => error!("{}: failed to show entries: {}", job.base(), e),
            },
            Command::Wait { delay_ms } => {
                if delay_ms > 0 {
                    debug!("{}: waiting {} ms", job.base(), delay_ms);
                    thread::sleep(Duration::from_millis(delay_ms));
                }
            }
            Command::Backup => {
                if let Err(e) = self.backups.backup(&self.store, job.dir(), job.base()) {
                    error!("{}: failed to perform backup: {}", job.base(), e);
                }
            }
            Command::Help => {
                let mut stdout = std::io::stdout().lock();
                if let Err(e) = stdout.write_all(HELP_TEXT.as_bytes()) {
                    warn!("Failed to print help: {}", e);
                }
            }
            Command::Empty => {}
            Command::Invalid { reason } => {
                error!("{}: {}. See HELP for usage", job.base(), reason);
            }
            Command::EndOfCommands => return Ok(Flow::Done),
        }

        Ok(Flow::Continue)
    }

    /// Block until every backup started so far is written
    pub fn wait_for_backups(&self) {
        self.backups.wait_all();
    }

    /// Close the engine gracefully
    ///
    /// Taking `self` guarantees no worker still borrows the store.
    pub fn close(self) -> Result<()> {
        self.backups.wait_all();
        self.store.terminate()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the store
    pub fn store(&self) -> &KvStore {
        &self.store
    }

    /// Get the backup manager
    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }
}
