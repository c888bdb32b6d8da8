//! modem-scraper - binary entry point and polling schedule.
//!
//! # Architecture
//!
//! The binary owns the schedule; [`modem_engine::Engine`] owns the cycle.
//!
//! ```text
//! main() -> ScraperConfig::load -> Engine::from_config
//!              |
//!              v
//!   interval tick -> spawn_blocking(Engine::run_cycle) -> log report
//!              |
//!              v
//!           Ctrl-C -> wait for the in-flight cycle -> exit
//! ```
//!
//! Cycles run on the blocking pool because the ledger and the file sinks do
//! synchronous I/O. A tick that arrives while a cycle is still running is
//! rejected by the engine's guard and counted as skipped.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use modem_config::ScraperConfig;
use modem_engine::{CycleError, CycleMetrics, Engine};

#[derive(Debug, Parser)]
#[command(name = "modem-scraper")]
#[command(about = "Forward each cable modem event log entry exactly once")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.modem-scraper/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Invalid log filter")?;

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();
        tracing::info!(path = %path.display(), "Logging initialized");
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    Ok(())
}

/// Run one cycle on the blocking pool and log its outcome.
async fn run_cycle(engine: Arc<Engine>) -> Result<()> {
    let result = tokio::task::spawn_blocking({
        let engine = Arc::clone(&engine);
        move || engine.run_cycle()
    })
    .await
    .context("Cycle task panicked")?;

    let snapshot = engine.metrics().snapshot();
    match result {
        Ok(report) => {
            tracing::info!(
                op = "scraper.cycle",
                stage = ?report.stage,
                collected = report.collected,
                novel = report.novel,
                delivered = report.delivered_to.len(),
                failed_sinks = report.failed_sinks.len(),
                buckets_written = report.commit.as_ref().map_or(0, |c| c.written.len()),
                buckets_failed = report.commit.as_ref().map_or(0, |c| c.failed.len()),
                "Cycle complete"
            );
            tracing::debug!(op = "scraper.metrics", ?snapshot, "Metrics");
            Ok(())
        }
        // Already counted and logged by the engine.
        Err(CycleError::Busy) => Ok(()),
        Err(err) => {
            tracing::debug!(op = "scraper.metrics", ?snapshot, "Metrics");
            Err(err.into())
        }
    }
}

/// Tick until `shutdown` resolves, then wait for every spawned cycle.
async fn run_schedule<F>(engine: Arc<Engine>, interval: Duration, shutdown: F) -> Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let mut ticks = tokio::time::interval(interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    // Ticks that land on a running cycle end with `Busy`; all of them stay
    // tracked so shutdown waits on the one that holds the ledger.
    let mut cycles = JoinSet::new();
    loop {
        tokio::select! {
            _ = ticks.tick() => {
                while cycles.try_join_next().is_some() {}
                let engine = Arc::clone(&engine);
                cycles.spawn(async move {
                    if let Err(err) = run_cycle(engine).await {
                        tracing::debug!(error = %format!("{err:#}"), "Cycle ended with error");
                    }
                });
            }
            signal = &mut shutdown => {
                signal.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    while let Some(joined) = cycles.join_next().await {
        if let Err(err) = joined {
            tracing::warn!(error = %err, "In-flight cycle did not finish cleanly");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let config = ScraperConfig::load(cli.config.as_deref())?;
    let metrics = Arc::new(CycleMetrics::new());
    let engine = Arc::new(Engine::from_config(&config, Arc::clone(&metrics))?);
    tracing::info!(
        interval_secs = config.polling.interval_secs,
        dedup = ?engine.dedup(),
        "Starting modem-scraper"
    );

    if cli.once {
        return run_cycle(engine).await;
    }

    run_schedule(
        engine,
        Duration::from_secs(config.polling.interval_secs),
        tokio::signal::ctrl_c(),
    )
    .await?;
    tracing::info!(metrics = ?metrics.snapshot(), "Stopped");
    Ok(())
}
