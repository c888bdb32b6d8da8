//! Event log sources.
//!
//! Fetching and parsing the device's web pages happens upstream of this crate.
//! The collector seam only hands the engine a fully parsed batch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use modem_types::EventLogRecord;

/// Produces the device's current event log, in device order.
pub trait Collector {
    fn collect(&mut self) -> Result<Vec<EventLogRecord>>;
}

impl<F> Collector for F
where
    F: FnMut() -> Result<Vec<EventLogRecord>>,
{
    fn collect(&mut self) -> Result<Vec<EventLogRecord>> {
        self()
    }
}

/// Reads the latest scrape from a JSON array file.
#[derive(Debug, Clone)]
pub struct SnapshotCollector {
    path: PathBuf,
}

impl SnapshotCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Collector for SnapshotCollector {
    fn collect(&mut self) -> Result<Vec<EventLogRecord>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read event log snapshot {}", self.path.display()))?;
        let records: Vec<EventLogRecord> = serde_json::from_str(&content).with_context(|| {
            format!("Failed to parse event log snapshot {}", self.path.display())
        })?;
        tracing::debug!(
            op = "collector.snapshot",
            path = %self.path.display(),
            records = records.len(),
            "Collected event log snapshot"
        );
        Ok(records)
    }
}
