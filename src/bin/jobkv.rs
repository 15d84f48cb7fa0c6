//! jobkv Binary
//!
//! Runs every job file in a directory against a fresh store.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use jobkv::{Config, Engine, KvsError};
use tracing_subscriber::{fmt, EnvFilter};

/// jobkv
#[derive(Parser, Debug)]
#[command(name = "jobkv")]
#[command(about = "Concurrent key-value store driven by batch job files")]
#[command(version)]
struct Args {
    /// Directory containing the .job files
    job_dir: PathBuf,

    /// Maximum number of concurrent backups
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    max_backups: u64,

    /// Number of worker threads
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    max_threads: u64,
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout is reserved for HELP output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,jobkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    tracing::info!("jobkv v{}", jobkv::VERSION);
    tracing::info!("Job directory: {}", args.job_dir.display());

    let config = Config::builder()
        .job_dir(&args.job_dir)
        .max_backups(args.max_backups as usize)
        .max_threads(args.max_threads as usize)
        .build();

    let engine = match Engine::open(config) {
        Ok(engine) => engine,
        Err(e @ KvsError::Config(_)) => {
            tracing::error!("Invalid arguments: {}", e);
            return ExitCode::from(1);
        }
        Err(e) => {
            tracing::error!("Failed to initialize KVS: {}", e);
            return ExitCode::from(1);
        }
    };

    match engine.run() {
        Ok(summary) => {
            tracing::info!(
                "{} jobs completed, {} failed, {} backups written (peak {} in flight)",
                summary.jobs_completed(),
                summary.jobs_failed(),
                summary.backups_completed,
                summary.peak_backups
            );
        }
        Err(e) => {
            tracing::error!("Failed to process job directory: {}", e);
            let _ = engine.close();
            return ExitCode::from(1);
        }
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to terminate KVS: {}", e);
    }

    ExitCode::SUCCESS
}
