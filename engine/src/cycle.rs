//! One polling cycle: collect -> prune -> publish -> commit.
//!
//! # Key Invariant
//!
//! **The ledger only learns about records that reached a sink.** Commit runs
//! after publishing, with exactly the novel batch, and only if at least one
//! sink accepted it.
//!
//! A failure at any stage abandons the in-memory cycle. The next tick starts
//! over from collection; prune's membership test and commit's union make the
//! repeat safe.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, TryLockError};

use anyhow::Context;
use modem_config::ScraperConfig;
use modem_ledger::{CommitReport, LedgerError, LedgerStore, commit, prune};
use modem_types::EventLogRecord;
use thiserror::Error;

use crate::{
    Collector, CycleMetrics, JsonLinesPublisher, LogPublisher, Publisher, SnapshotCollector,
};

/// Whether records are deduplicated against a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupMode {
    /// Every collected record is forwarded every cycle.
    Disabled,
    /// Dedup against the ledger at this path.
    Ledger(PathBuf),
}

/// Furthest stage a cycle reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CycleStage {
    Collected,
    Pruned,
    Published,
    Committed,
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("another cycle is still running")]
    Busy,
    #[error("failed to collect event log: {0:#}")]
    Collect(anyhow::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub stage: CycleStage,
    pub collected: usize,
    pub novel: usize,
    /// Sinks that accepted the novel batch.
    pub delivered_to: Vec<String>,
    /// Sinks whose publish failed.
    pub failed_sinks: Vec<String>,
    /// Present when the ledger was updated this cycle.
    pub commit: Option<CommitReport>,
}

impl CycleReport {
    fn new(collected: usize) -> Self {
        Self {
            stage: CycleStage::Collected,
            collected,
            novel: 0,
            delivered_to: Vec::new(),
            failed_sinks: Vec::new(),
            commit: None,
        }
    }
}

/// Collaborators mutated by a cycle. Holding the lock is what makes a cycle active.
struct CycleParts {
    collector: Box<dyn Collector + Send>,
    publishers: Vec<Box<dyn Publisher + Send>>,
}

pub struct Engine {
    parts: Mutex<CycleParts>,
    dedup: DedupMode,
    metrics: Arc<CycleMetrics>,
}

impl Engine {
    pub fn new(
        collector: Box<dyn Collector + Send>,
        publishers: Vec<Box<dyn Publisher + Send>>,
        dedup: DedupMode,
        metrics: Arc<CycleMetrics>,
    ) -> Self {
        Self {
            parts: Mutex::new(CycleParts {
                collector,
                publishers,
            }),
            dedup,
            metrics,
        }
    }

    /// Wire the shipped collector and sinks from configuration.
    pub fn from_config(config: &ScraperConfig, metrics: Arc<CycleMetrics>) -> anyhow::Result<Self> {
        let snapshot = config
            .collector
            .resolved_snapshot_path()
            .context("collector.snapshot_path is not configured")?;

        let mut publishers: Vec<Box<dyn Publisher + Send>> = Vec::new();
        if config.sinks.log.enabled {
            publishers.push(Box::new(LogPublisher));
        }
        if config.sinks.jsonl.enabled {
            let path = config
                .sinks
                .jsonl
                .resolved_path()
                .context("sinks.jsonl.path is not configured")?;
            publishers.push(Box::new(JsonLinesPublisher::new(path)));
        }
        if publishers.is_empty() {
            tracing::warn!("No sinks enabled; records will never be forwarded or committed");
        }

        let dedup = if config.ledger.enabled {
            let path = config
                .ledger
                .resolved_path()
                .context("ledger.path is not configured and no home directory was found")?;
            DedupMode::Ledger(path)
        } else {
            DedupMode::Disabled
        };

        Ok(Self::new(
            Box::new(SnapshotCollector::new(snapshot)),
            publishers,
            dedup,
            metrics,
        ))
    }

    #[must_use]
    pub fn dedup(&self) -> &DedupMode {
        &self.dedup
    }

    #[must_use]
    pub fn metrics(&self) -> &CycleMetrics {
        &self.metrics
    }

    /// Run one cycle. Returns [`CycleError::Busy`] without side effects if
    /// another cycle holds the guard.
    pub fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let mut parts = match self.parts.try_lock() {
            Ok(parts) => parts,
            Err(TryLockError::WouldBlock) => {
                self.metrics.cycle_skipped_busy();
                tracing::warn!(op = "engine.cycle", "Previous cycle still running; skipping tick");
                return Err(CycleError::Busy);
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                tracing::warn!(op = "engine.cycle", "Previous cycle panicked; continuing");
                poisoned.into_inner()
            }
        };

        self.metrics.cycle_started();
        tracing::debug!(op = "engine.cycle", "Waking up");
        let result = self.run_locked(&mut parts);
        match &result {
            Ok(report) => tracing::debug!(
                op = "engine.cycle",
                stage = ?report.stage,
                "Going back to sleep"
            ),
            Err(err) => {
                self.metrics.cycle_failed();
                tracing::error!(op = "engine.cycle", error = %err, "Cycle failed");
            }
        }
        result
    }

    fn run_locked(&self, parts: &mut CycleParts) -> Result<CycleReport, CycleError> {
        let batch = parts.collector.collect().map_err(CycleError::Collect)?;
        let mut report = CycleReport::new(batch.len());

        // Opened before pruning and held until the end of the cycle; dropping
        // it on any early return releases the handle.
        let mut ledger = match &self.dedup {
            DedupMode::Disabled => None,
            DedupMode::Ledger(path) => Some(LedgerStore::open(path)?),
        };

        let novel = match &ledger {
            Some(store) => prune(&batch, store),
            None => batch,
        };
        report.novel = novel.len();
        report.stage = CycleStage::Pruned;
        self.metrics.records(report.collected, report.novel);

        if novel.is_empty() {
            tracing::info!(
                op = "engine.cycle",
                collected = report.collected,
                "No new event log records"
            );
            close_ledger(ledger);
            return Ok(report);
        }

        publish_all(&mut parts.publishers, &novel, &mut report, &self.metrics);
        if report.delivered_to.is_empty() {
            tracing::warn!(
                op = "engine.cycle",
                novel = report.novel,
                "No sink accepted the batch; records stay novel for the next cycle"
            );
            close_ledger(ledger);
            return Ok(report);
        }
        report.stage = CycleStage::Published;

        if let Some(store) = ledger.as_mut() {
            let outcome = commit(&novel, store);
            self.metrics
                .buckets(outcome.written.len(), outcome.failed.len());
            if !outcome.is_complete() {
                tracing::warn!(
                    op = "engine.cycle",
                    failed = outcome.failed.len(),
                    "Some ledger buckets were not committed"
                );
            }
            report.commit = Some(outcome);
            report.stage = CycleStage::Committed;
        }
        close_ledger(ledger);

        tracing::info!(
            op = "engine.cycle",
            collected = report.collected,
            novel = report.novel,
            sinks = report.delivered_to.len(),
            "Forwarded new event log records"
        );
        Ok(report)
    }
}

fn publish_all(
    publishers: &mut [Box<dyn Publisher + Send>],
    novel: &[EventLogRecord],
    report: &mut CycleReport,
    metrics: &CycleMetrics,
) {
    for publisher in publishers {
        let name = publisher.name().to_string();
        match publisher.publish(novel) {
            Ok(()) => report.delivered_to.push(name),
            Err(err) => {
                metrics.publish_failed();
                tracing::error!(
                    op = "engine.publish",
                    sink = %name,
                    error = %format!("{err:#}"),
                    "Failed to publish event log records"
                );
                report.failed_sinks.push(name);
            }
        }
    }
}

fn close_ledger(ledger: Option<LedgerStore>) {
    if let Some(store) = ledger
        && let Err(err) = store.close()
    {
        tracing::warn!(op = "ledger.close", error = %err, "Failed to close ledger cleanly");
    }
}
