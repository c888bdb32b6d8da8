//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use modem_engine::{CycleMetrics, DedupMode, Engine, Publisher, SnapshotCollector};
use modem_ledger::{Ledger, LedgerError, LedgerStore};
use modem_types::{BucketKey, EventLogRecord, FingerprintSet};

pub fn link_up() -> EventLogRecord {
    EventLogRecord::new("2024-01-01 00:00:00", 1, 3, "link up")
}

pub fn link_down() -> EventLogRecord {
    EventLogRecord::new("2024-01-01 00:05:00", 2, 5, "link down")
}

pub fn ranging_timeout() -> EventLogRecord {
    EventLogRecord::new("2024-01-01 00:10:00", 82_000_200, 3, "T3 time-out")
}

/// Overwrite the snapshot the collector reads on its next cycle.
pub fn write_snapshot(path: &Path, records: &[EventLogRecord]) {
    let json = serde_json::to_string_pretty(records).unwrap();
    std::fs::write(path, json).unwrap();
}

pub type Delivered = Arc<Mutex<Vec<Vec<EventLogRecord>>>>;

/// Sink that keeps every batch it accepted. `fail` can be flipped between cycles.
pub struct MemorySink {
    pub name: &'static str,
    pub fail: Arc<Mutex<bool>>,
    pub delivered: Delivered,
}

impl MemorySink {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fail: Arc::new(Mutex::new(false)),
            delivered: Arc::default(),
        }
    }
}

impl Publisher for MemorySink {
    fn name(&self) -> &str {
        self.name
    }

    fn publish(&mut self, records: &[EventLogRecord]) -> anyhow::Result<()> {
        if *self.fail.lock().unwrap() {
            bail!("{} unavailable", self.name);
        }
        self.delivered.lock().unwrap().push(records.to_vec());
        Ok(())
    }
}

/// Temp directory holding a snapshot file and a ledger file.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub snapshot: PathBuf,
    pub ledger: PathBuf,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("eventlog.json");
        let ledger = dir.path().join("state").join("ledger.db");
        Self {
            dir,
            snapshot,
            ledger,
        }
    }

    /// Engine reading the snapshot file, deduplicating against the ledger file.
    pub fn engine(&self, sink: MemorySink) -> Engine {
        Engine::new(
            Box::new(SnapshotCollector::new(&self.snapshot)),
            vec![Box::new(sink)],
            DedupMode::Ledger(self.ledger.clone()),
            Arc::new(CycleMetrics::new()),
        )
    }

    pub fn open_ledger(&self) -> LedgerStore {
        LedgerStore::open(&self.ledger).unwrap()
    }
}

/// Ledger whose reads or writes fail for the listed buckets.
pub struct FaultyLedger {
    pub inner: LedgerStore,
    pub failing: BTreeSet<BucketKey>,
    pub unreadable: BTreeSet<BucketKey>,
}

impl FaultyLedger {
    pub fn new(inner: LedgerStore) -> Self {
        Self {
            inner,
            failing: BTreeSet::new(),
            unreadable: BTreeSet::new(),
        }
    }
}

impl Ledger for FaultyLedger {
    fn load(&self, bucket: &BucketKey) -> Result<FingerprintSet, LedgerError> {
        if self.unreadable.contains(bucket) {
            return Err(LedgerError::BucketQuery {
                bucket: bucket.clone(),
                source: "database is locked".into(),
            });
        }
        self.inner.load(bucket)
    }

    fn put(&mut self, bucket: &BucketKey, set: &FingerprintSet) -> Result<(), LedgerError> {
        if self.failing.contains(bucket) {
            return Err(LedgerError::BucketWrite {
                bucket: bucket.clone(),
                source: "simulated write fault".into(),
            });
        }
        self.inner.put(bucket, set)
    }
}
