use std::collections::HashMap;

use modem_types::{BucketKey, EventLogRecord, FingerprintSet, fingerprint};

use crate::Ledger;

/// Return the records of `batch` whose fingerprint is not yet in the ledger,
/// preserving input order.
///
/// Read-only: the ledger is updated separately by [`crate::commit`], once the
/// caller knows what was actually forwarded. Each bucket is read at most once
/// per call.
pub fn prune<L: Ledger + ?Sized>(batch: &[EventLogRecord], ledger: &L) -> Vec<EventLogRecord> {
    let mut seen: HashMap<BucketKey, FingerprintSet> = HashMap::new();
    let mut novel = Vec::new();

    for record in batch {
        let bucket = record.bucket_key();
        let recorded = seen
            .entry(bucket)
            .or_insert_with_key(|bucket| ledger.get(bucket));
        if !recorded.contains(&fingerprint(record)) {
            novel.push(record.clone());
        }
    }

    tracing::debug!(
        op = "ledger.prune",
        collected = batch.len(),
        novel = novel.len(),
        buckets = seen.len(),
        "Pruned event log batch"
    );
    novel
}
