//! Cycle metrics registry.
//!
//! Built once by the binary and handed to the engine behind an `Arc`. Nothing
//! registers itself globally.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct CycleMetrics {
    cycles_started: AtomicU64,
    cycles_failed: AtomicU64,
    cycles_skipped_busy: AtomicU64,
    records_collected: AtomicU64,
    records_novel: AtomicU64,
    buckets_committed: AtomicU64,
    bucket_write_failures: AtomicU64,
    publish_failures: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles_started: u64,
    pub cycles_failed: u64,
    pub cycles_skipped_busy: u64,
    pub records_collected: u64,
    pub records_novel: u64,
    pub buckets_committed: u64,
    pub bucket_write_failures: u64,
    pub publish_failures: u64,
}

fn add(counter: &AtomicU64, n: usize) {
    counter.fetch_add(n as u64, Ordering::Relaxed);
}

impl CycleMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cycle_started(&self) {
        add(&self.cycles_started, 1);
    }

    pub(crate) fn cycle_failed(&self) {
        add(&self.cycles_failed, 1);
    }

    pub(crate) fn cycle_skipped_busy(&self) {
        add(&self.cycles_skipped_busy, 1);
    }

    pub(crate) fn records(&self, collected: usize, novel: usize) {
        add(&self.records_collected, collected);
        add(&self.records_novel, novel);
    }

    pub(crate) fn buckets(&self, committed: usize, failed: usize) {
        add(&self.buckets_committed, committed);
        add(&self.bucket_write_failures, failed);
    }

    pub(crate) fn publish_failed(&self) {
        add(&self.publish_failures, 1);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            cycles_started: load(&self.cycles_started),
            cycles_failed: load(&self.cycles_failed),
            cycles_skipped_busy: load(&self.cycles_skipped_busy),
            records_collected: load(&self.records_collected),
            records_novel: load(&self.records_novel),
            buckets_committed: load(&self.buckets_committed),
            bucket_write_failures: load(&self.bucket_write_failures),
            publish_failures: load(&self.publish_failures),
        }
    }
}
