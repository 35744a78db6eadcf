// Final-standings batch entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Load the era table
// 4. Resolve every configured season, bounded by the worker count
// 5. Print one summary line per season
// 6. Exit non-zero if any season failed

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use stag_app::config;
use stag_app::report;
use stag_app::runner::{self, BatchPaths};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("stag-standings starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    let seasons = config.seasons();
    info!(
        "Config loaded: league={}, {} seasons, {} workers",
        config.league.name,
        seasons.len(),
        config.run.workers
    );

    // 3. Era table
    let table = config.format_table().context("failed to load era table")?;

    // 4. Resolve
    let reports = runner::run_seasons(
        Arc::new(table),
        BatchPaths::from_config(&config),
        &seasons,
        config.run.workers,
    )
    .await;

    // 5. Summaries
    let mut failed = 0usize;
    for r in &reports {
        match &r.result {
            Ok(run) => println!("{}", report::summary_line(&run.outcome)),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", r.year, e);
            }
        }
    }

    // 6. Exit status
    if failed > 0 {
        anyhow::bail!("{failed} of {} seasons failed", reports.len());
    }
    info!("stag-standings finished");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("stag-standings.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stag_app=info,stag_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
