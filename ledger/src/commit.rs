//! Committer - merge forwarded records' fingerprints into the ledger.
//!
//! The store only overwrites, so each affected bucket goes through
//! read -> union -> write. The union is what keeps fingerprints recorded by
//! earlier cycles from being erased.
//!
//! Buckets are independent units of work: a failed write is logged and
//! reported, and the remaining buckets are still committed. A lost bucket is
//! recovered by whichever later cycle touches the same key again, because the
//! merge is idempotent.

use std::collections::BTreeMap;

use modem_types::{BucketKey, EventLogRecord, FingerprintSet, fingerprint};

use crate::Ledger;

/// Outcome of one [`commit`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Buckets whose merged set was written.
    pub written: Vec<BucketKey>,
    /// Buckets that already contained every fingerprint; nothing was written.
    pub unchanged: Vec<BucketKey>,
    /// Buckets whose write failed this cycle.
    pub failed: Vec<BucketKey>,
    /// Fingerprints newly added across all written buckets.
    pub fingerprints_added: usize,
}

impl CommitReport {
    /// True when every affected bucket now reflects the batch.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn buckets_touched(&self) -> usize {
        self.written.len() + self.unchanged.len() + self.failed.len()
    }
}

/// Group a batch by bucket key, collapsing duplicate records.
#[must_use]
pub fn fingerprints_by_bucket(batch: &[EventLogRecord]) -> BTreeMap<BucketKey, FingerprintSet> {
    let mut grouped: BTreeMap<BucketKey, FingerprintSet> = BTreeMap::new();
    for record in batch {
        grouped
            .entry(record.bucket_key())
            .or_default()
            .insert(fingerprint(record));
    }
    grouped
}

/// Record `batch` as forwarded.
///
/// Pass exactly what was delivered downstream (normally the output of
/// [`crate::prune`]) so the ledger means "forwarded", not "seen".
pub fn commit<L: Ledger + ?Sized>(batch: &[EventLogRecord], ledger: &mut L) -> CommitReport {
    let mut report = CommitReport::default();

    for (bucket, incoming) in fingerprints_by_bucket(batch) {
        // Merging onto a set that was never read would overwrite the stored one.
        let mut merged = match ledger.load(&bucket) {
            Ok(existing) => existing,
            Err(err) => {
                tracing::warn!(
                    op = "ledger.commit",
                    bucket = %bucket,
                    error = %err,
                    "Failed to read ledger bucket; skipping its write this cycle"
                );
                report.failed.push(bucket);
                continue;
            }
        };
        let before = merged.len();
        merged.extend(incoming);
        let added = merged.len() - before;

        if added == 0 {
            report.unchanged.push(bucket);
            continue;
        }

        match ledger.put(&bucket, &merged) {
            Ok(()) => {
                report.fingerprints_added += added;
                report.written.push(bucket);
            }
            Err(err) => {
                tracing::warn!(
                    op = "ledger.commit",
                    bucket = %bucket,
                    error = %err,
                    "Failed to commit ledger bucket; will merge again on a later cycle"
                );
                report.failed.push(bucket);
            }
        }
    }

    tracing::debug!(
        op = "ledger.commit",
        written = report.written.len(),
        unchanged = report.unchanged.len(),
        failed = report.failed.len(),
        added = report.fingerprints_added,
        "Committed event log batch"
    );
    report
}
