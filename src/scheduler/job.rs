//! Job Runner
//!
//! Executes a single job file from start to finish.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::config::Config;
use crate::engine::{Engine, Flow};
use crate::error::{KvsError, Result};
use crate::protocol::{parse_line, Command, CommandType, COMMENT_MARKER};

/// A job script and the files derived from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFile {
    /// The script being executed
    input: PathBuf,

    /// Where READ/DELETE/SHOW output goes
    output: PathBuf,

    /// Directory the job lives in (backups are written here too)
    dir: PathBuf,

    /// File name without the job extension
    base: String,
}

impl JobFile {
    /// Recognize `path` as a job file
    ///
    /// Returns `None` for anything that does not carry the job extension,
    /// such as output or backup files left over from an earlier run.
    pub fn from_path(path: &Path, config: &Config) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        if extension != config.job_extension {
            return None;
        }

        let base = path.file_stem()?.to_str()?;
        if base.is_empty() {
            return None;
        }

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let output = dir.join(format!("{}.{}", base, config.output_extension));

        Some(Self {
            input: path.to_path_buf(),
            output,
            dir,
            base: base.to_string(),
        })
    }

    /// Path of the job script
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Path of the output file
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Directory holding the job
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Base name used for output and backup files
    pub fn base(&self) -> &str {
        &self.base
    }
}

/// Counters collected while running one job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    /// Commands dispatched, not counting the end-of-commands marker
    pub commands: usize,

    /// Lines that failed to parse
    pub invalid: usize,

    /// BACKUP commands issued
    pub backups: usize,
}

/// Runs one job's commands sequentially against the engine
pub struct JobRunner<'a> {
    engine: &'a Engine,
    job: &'a JobFile,
}

impl<'a> JobRunner<'a> {
    pub fn new(engine: &'a Engine, job: &'a JobFile) -> Self {
        Self { engine, job }
    }

    /// Run the job to completion (blocking)
    ///
    /// Any I/O failure on the input or output file abandons the job and is
    /// returned tagged with the job's path.
    pub fn run(&self) -> Result<JobStats> {
        let input = File::open(&self.job.input).map_err(|e| self.io_error(e))?;
        let output = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.job.output)
            .map_err(|e| self.io_error(e))?;

        info!("Executing job {}", self.job.input.display());

        let mut reader = BufReader::new(input);
        let mut writer = BufWriter::new(output);
        let stats = self.execute_lines(&mut reader, &mut writer)?;

        writer
            .flush()
            .and_then(|_| writer.get_ref().sync_all())
            .map_err(|e| self.io_error(e))?;

        info!(
            "Job {} done: {} commands, {} invalid",
            self.job.input.display(),
            stats.commands,
            stats.invalid
        );
        Ok(stats)
    }

    /// Read, parse and dispatch lines until the job is done
    fn execute_lines<R: BufRead, W: Write>(&self, reader: &mut R, writer: &mut W) -> Result<JobStats> {
        let limits = self.engine.config().parse_limits();
        let mut stats = JobStats::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| self.io_error(e))?;

            let command = if read == 0 {
                Command::EndOfCommands
            } else {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');

                if line.is_empty() || line.starts_with(COMMENT_MARKER) {
                    trace!("Skipping line {:?}", line);
                    continue;
                }

                parse_line(line, &limits).unwrap_or_else(|e| Command::Invalid {
                    reason: format!("{} ({:?})", e, line),
                })
            };

            match command.command_type() {
                CommandType::EndOfCommands => {}
                CommandType::Invalid => {
                    stats.commands += 1;
                    stats.invalid += 1;
                }
                CommandType::Backup => {
                    stats.commands += 1;
                    stats.backups += 1;
                }
                _ => stats.commands += 1,
            }

            debug!("{}: {}", self.job.base, command.command_type());
            match self.engine.execute(command, self.job, writer) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Done) => break,
                Err(KvsError::Io(e)) => return Err(self.io_error(e)),
                Err(e) => return Err(e),
            }
        }

        Ok(stats)
    }

    fn io_error(&self, source: std::io::Error) -> KvsError {
        KvsError::job(&self.job.input, source)
    }
}
