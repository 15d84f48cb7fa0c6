//! Scheduler Module
//!
//! Fixed worker pool draining a directory of job files.
//!
//! ## Architecture
//! - One shared directory iterator, claimed under a lock
//! - N worker threads, each running one job at a time
//! - Commands routed through Engine

mod job;
mod pool;

pub use job::{JobFile, JobRunner, JobStats};
pub use pool::{JobOutcome, JobReport, RunSummary, Scheduler};
