// Multi-season batch: resolve several seasons concurrently, one blocking
// task per season, bounded by the configured worker count.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use stag_core::{resolve_season, EngineError, FormatTable, SeasonOutcome};

use crate::config::Config;
use crate::ingest::{load_season, IngestError};
use crate::report::{write_outcome, ReportError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("season task failed: {0}")]
    Task(String),
}

impl RunError {
    /// Whether re-running with more data could succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            RunError::Engine(e) => e.is_recoverable(),
            _ => false,
        }
    }
}

/// What happened to one season of a batch.
#[derive(Debug)]
pub struct SeasonReport {
    pub year: u16,
    pub result: Result<SeasonRun, RunError>,
}

/// A resolved season and the files written for it.
#[derive(Debug)]
pub struct SeasonRun {
    pub outcome: SeasonOutcome,
    pub written: Vec<PathBuf>,
}

/// Where a batch reads from and writes to.
#[derive(Debug, Clone)]
pub struct BatchPaths {
    pub data_dir: PathBuf,
    /// Reports are skipped when `None`.
    pub output_dir: Option<PathBuf>,
}

impl BatchPaths {
    pub fn from_config(config: &Config) -> Self {
        BatchPaths {
            data_dir: config.data_dir.clone(),
            output_dir: Some(config.output_dir.clone()),
        }
    }
}

/// Load, resolve and write one season.
pub fn run_season(table: &FormatTable, paths: &BatchPaths, year: u16) -> Result<SeasonRun, RunError> {
    let input = load_season(&paths.data_dir, year)?;
    let outcome = resolve_season(table, &input)?;
    let written = match &paths.output_dir {
        Some(dir) => write_outcome(dir, &outcome)?,
        None => Vec::new(),
    };
    Ok(SeasonRun { outcome, written })
}

/// Resolve every season in `years`, at most `workers` at a time.
///
/// A failing season is logged and reported; the others still complete.
/// Reports come back in year order whatever order the tasks finish in.
pub async fn run_seasons(
    table: Arc<FormatTable>,
    paths: BatchPaths,
    years: &[u16],
    workers: usize,
) -> Vec<SeasonReport> {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let paths = Arc::new(paths);
    let mut tasks = JoinSet::new();

    for &year in years {
        let table = Arc::clone(&table);
        let paths = Arc::clone(&paths);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => {
                    tokio::task::spawn_blocking(move || run_season(&table, &paths, year))
                        .await
                        .unwrap_or_else(|e| Err(RunError::Task(format!("{year}: {e}"))))
                }
                Err(e) => Err(RunError::Task(format!("{year}: {e}"))),
            };
            SeasonReport { year, result }
        });
    }

    let mut reports = Vec::with_capacity(years.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(report) => {
                log_report(&report);
                reports.push(report);
            }
            Err(e) => error!("season task panicked or was cancelled: {}", e),
        }
    }
    reports.sort_by_key(|r| r.year);
    reports
}

fn log_report(report: &SeasonReport) {
    match &report.result {
        Ok(run) => info!(
            "season {} done ({:?}), {} files written",
            report.year,
            run.outcome.status,
            run.written.len()
        ),
        Err(e) if e.is_recoverable() => {
            warn!("season {} incomplete, re-run with more data: {}", report.year, e)
        }
        Err(e) => error!("season {} failed: {}", report.year, e),
    }
}
