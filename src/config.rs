//! Configuration for jobkv
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

use crate::error::{KvsError, Result};
use crate::protocol::ParseLimits;

/// Main configuration for a jobkv run
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Job Directory Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the job scripts. Output and backup files are
    /// written next to the job that produced them:
    ///   {job_dir}/
    ///     ├── name.job        (input script)
    ///     ├── name.out        (command output)
    ///     └── name-1.bck      (first backup taken by name.job)
    pub job_dir: PathBuf,

    /// Extension (without the dot) that marks a directory entry as a job
    pub job_extension: String,

    /// Extension of the per-job output file
    pub output_extension: String,

    /// Extension of backup files
    pub backup_extension: String,

    // -------------------------------------------------------------------------
    // Concurrency Configuration
    // -------------------------------------------------------------------------
    /// Maximum number of backups in flight at once (K)
    pub max_backups: usize,

    /// Number of workers draining the job directory
    pub max_threads: usize,

    // -------------------------------------------------------------------------
    // Command Limits
    // -------------------------------------------------------------------------
    /// Max pairs (WRITE) or keys (READ/DELETE) in a single command
    pub max_pairs: usize,

    /// Max length of a key or value, in bytes
    pub max_string_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            job_dir: PathBuf::from("."),
            job_extension: "job".to_string(),
            output_extension: "out".to_string(),
            backup_extension: "bck".to_string(),
            max_backups: 1,
            max_threads: 1,
            max_pairs: 256,
            max_string_size: 40,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Limits handed to the line parser
    pub fn parse_limits(&self) -> ParseLimits {
        ParseLimits {
            max_pairs: self.max_pairs,
            max_string_size: self.max_string_size,
        }
    }

    /// Check that the configuration can drive a run
    pub fn validate(&self) -> Result<()> {
        if self.max_backups == 0 {
            return Err(KvsError::config("max_backups must be at least 1"));
        }
        if self.max_threads == 0 {
            return Err(KvsError::config("max_threads must be at least 1"));
        }
        if self.max_pairs == 0 || self.max_string_size == 0 {
            return Err(KvsError::config("command limits must be positive"));
        }

        let extensions = [
            &self.job_extension,
            &self.output_extension,
            &self.backup_extension,
        ];
        if extensions.iter().any(|ext| ext.is_empty() || ext.contains('.')) {
            return Err(KvsError::config(
                "file extensions must be non-empty and must not contain '.'",
            ));
        }
        if self.job_extension == self.output_extension
            || self.job_extension == self.backup_extension
            || self.output_extension == self.backup_extension
        {
            return Err(KvsError::config("file extensions must be distinct"));
        }

        if !self.job_dir.is_dir() {
            return Err(KvsError::config(format!(
                "job directory {} does not exist or is not a directory",
                self.job_dir.display()
            )));
        }

        Ok(())
    }

    /// Get the job directory
    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the job directory
    pub fn job_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.job_dir = path.into();
        self
    }

    /// Set the maximum number of concurrent backups
    pub fn max_backups(mut self, count: usize) -> Self {
        self.config.max_backups = count;
        self
    }

    /// Set the number of worker threads
    pub fn max_threads(mut self, count: usize) -> Self {
        self.config.max_threads = count;
        self
    }

    /// Set the job file extension
    pub fn job_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.job_extension = ext.into();
        self
    }

    /// Set the output file extension
    pub fn output_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.output_extension = ext.into();
        self
    }

    /// Set the backup file extension
    pub fn backup_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.backup_extension = ext.into();
        self
    }

    /// Set the max number of pairs/keys per command
    pub fn max_pairs(mut self, count: usize) -> Self {
        self.config.max_pairs = count;
        self
    }

    /// Set the max key/value length
    pub fn max_string_size(mut self, size: usize) -> Self {
        self.config.max_string_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
