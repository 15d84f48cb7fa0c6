//! # jobkv
//!
//! A concurrent in-memory key-value store driven by batch job scripts:
//! - A fixed worker pool drains a directory of `.job` files in parallel
//! - One reader/writer lock keeps every multi-key command atomic
//! - BACKUP snapshots bounded to K in flight, with versioned file names
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Job Directory                             │
//! │              (a.job, b.job, c.job, ...)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  claim one entry per idle worker
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Scheduler (N workers)                        │
//! │        line → parser → Command → Engine::execute             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   KvStore   │◄─────────│   Backup    │
//!   │  (RwLock)   │   dump   │  (K slots)  │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │ name-N.bck  │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod protocol;
pub mod backup;
pub mod scheduler;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvsError, Result};
pub use config::Config;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of jobkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
