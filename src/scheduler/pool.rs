//! Worker Pool
//!
//! A fixed number of workers drain one shared directory iterator.

use std::fs::{self, ReadDir};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{error, info, trace, warn};

use crate::engine::Engine;
use crate::error::{KvsError, Result};

use super::job::{JobFile, JobRunner, JobStats};

/// How a claimed job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed(String),
}

/// What one worker did with one claimed job
#[derive(Debug, Clone)]
pub struct JobReport {
    /// The job script
    pub job: PathBuf,

    /// Index of the worker that ran it
    pub worker: usize,

    pub outcome: JobOutcome,

    pub stats: JobStats,

    /// Wall-clock time from claim to completion
    pub elapsed: Duration,
}

/// Result of a full scheduler run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// One report per claimed job, grouped by worker
    pub reports: Vec<JobReport>,

    /// Backups written successfully by the end of the run
    pub backups_completed: u64,

    /// Backups that failed to write
    pub backups_failed: u64,

    /// Highest number of backups in flight at once
    pub peak_backups: usize,
}

impl RunSummary {
    /// Number of jobs that ran to completion
    pub fn jobs_completed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome == JobOutcome::Completed)
            .count()
    }

    /// Number of jobs abandoned on an I/O error
    pub fn jobs_failed(&self) -> usize {
        self.reports.len() - self.jobs_completed()
    }
}

/// Runs every job in the configured directory on a fixed worker pool
///
/// ## Concurrency Model
///
/// - Workers are scoped threads borrowing the engine
/// - Claiming a job = locking the shared `ReadDir`, advancing it to the next
///   job file, unlocking. Each entry is handed to exactly one worker.
/// - A worker runs its job to completion before claiming another and exits
///   once the iterator is exhausted
pub struct Scheduler<'a> {
    engine: &'a Engine,
}

impl<'a> Scheduler<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Process the whole job directory (blocking)
    ///
    /// Returns once every worker has exited and every backup they started
    /// has been written.
    pub fn run(&self) -> Result<RunSummary> {
        let config = self.engine.config();
        let entries = Mutex::new(fs::read_dir(config.job_dir())?);
        let workers = config.max_threads;

        info!(
            "Starting {} workers on {}",
            workers,
            config.job_dir().display()
        );

        let reports = crossbeam::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for worker in 0..workers {
                let entries = &entries;
                let handle = scope
                    .builder()
                    .name(format!("jobkv-worker-{}", worker))
                    .spawn(move |_| self.worker_loop(worker, entries))?;
                handles.push(handle);
            }

            let mut reports = Vec::new();
            for (worker, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(worker_reports) => reports.extend(worker_reports),
                    Err(_) => error!("Worker {} panicked", worker),
                }
            }
            Ok::<_, KvsError>(reports)
        })
        .map_err(|_| {
            KvsError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "worker pool panicked",
            ))
        })??;

        // Backups run detached from the workers; the run is not over until
        // they are on disk
        self.engine.wait_for_backups();

        let backups = self.engine.backups();

        let summary = RunSummary {
            reports,
            backups_completed: backups.completed(),
            backups_failed: backups.failed(),
            peak_backups: backups.peak_in_flight(),
        };

        info!(
            "Run finished: {} jobs completed, {} failed, {} backups",
            summary.jobs_completed(),
            summary.jobs_failed(),
            summary.backups_completed
        );
        Ok(summary)
    }

    /// One worker: claim, run, repeat until no jobs remain
    fn worker_loop(&self, worker: usize, entries: &Mutex<ReadDir>) -> Vec<JobReport> {
        let mut reports = Vec::new();

        while let Some(job) = self.claim_next(entries) {
            let started = Instant::now();
            let result = JobRunner::new(self.engine, &job).run();

            let (outcome, stats) = match result {
                Ok(stats) => (JobOutcome::Completed, stats),
                Err(e) => {
                    error!("Worker {}: {}", worker, e);
                    (JobOutcome::Failed(e.to_string()), JobStats::default())
                }
            };

            reports.push(JobReport {
                job: job.input().to_path_buf(),
                worker,
                outcome,
                stats,
                elapsed: started.elapsed(),
            });
        }

        trace!("Worker {} found no more jobs", worker);
        reports
    }

    /// Advance the shared iterator to the next job file (critical section)
    fn claim_next(&self, entries: &Mutex<ReadDir>) -> Option<JobFile> {
        let config = self.engine.config();
        let mut entries = entries.lock();

        for entry in &mut *entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            if !path.is_file() {
                continue;
            }

            match JobFile::from_path(&path, config) {
                Some(job) => return Some(job),
                None => trace!("Skipping non-job file {}", path.display()),
            }
        }

        None
    }
}
