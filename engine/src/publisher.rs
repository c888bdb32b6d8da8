//! Downstream sinks for novel records.
//!
//! The time-series and message-bus clients live outside this workspace; the
//! sinks here cover local forwarding (log stream, JSON lines file).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use modem_types::EventLogRecord;

/// A downstream sink. `publish` either forwards the whole slice or fails.
pub trait Publisher {
    fn name(&self) -> &str;

    fn publish(&mut self, records: &[EventLogRecord]) -> Result<()>;
}

/// Emits one `info` event per record.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn name(&self) -> &str {
        "log"
    }

    fn publish(&mut self, records: &[EventLogRecord]) -> Result<()> {
        for record in records {
            tracing::info!(
                op = "publish.log",
                timestamp = %record.timestamp,
                event_id = record.event_id,
                event_level = record.event_level,
                description = %record.description,
                "Event log record"
            );
        }
        Ok(())
    }
}

/// Appends one JSON object per record to a file.
#[derive(Debug, Clone)]
pub struct JsonLinesPublisher {
    path: PathBuf,
}

impl JsonLinesPublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Publisher for JsonLinesPublisher {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn publish(&mut self, records: &[EventLogRecord]) -> Result<()> {
        // Encode everything first so a serialization error writes nothing.
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record).context("Failed to encode event log record")?;
            buf.push(b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(&buf)
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        file.sync_data()
            .with_context(|| format!("Failed to sync {}", self.path.display()))?;
        Ok(())
    }
}
