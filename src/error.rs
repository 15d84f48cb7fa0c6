//! Error types for jobkv
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using KvsError
pub type Result<T> = std::result::Result<T, KvsError>;

/// Unified error type for jobkv operations
#[derive(Debug, Error)]
pub enum KvsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O failure that abandoned a single job
    #[error("job {path} aborted: {source}")]
    Job {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Store Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("KVS state must be initialized")]
    NotInitialized,

    #[error("KVS state has already been initialized")]
    AlreadyInitialized,

    // -------------------------------------------------------------------------
    // Job Script Errors
    // -------------------------------------------------------------------------
    #[error("Invalid command: {0}")]
    Parse(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvsError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Tag an I/O error with the job file it aborted
    pub fn job(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Job {
            path: path.into(),
            source,
        }
    }
}
