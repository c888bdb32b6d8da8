//! Ledger properties over file-backed stores.

use modem_ledger::{Ledger, LedgerStore, commit, prune};
use modem_types::{EventLogRecord, Fingerprint, FingerprintSet, fingerprint};

use crate::common::{FaultyLedger, Harness, link_down, link_up, ranging_timeout};

fn bucket_batch(n: i64) -> Vec<EventLogRecord> {
    (0..n)
        .map(|i| EventLogRecord::new("2024-02-01 12:00:00", i, 6, format!("event {i}")))
        .collect()
}

#[test]
fn prune_after_commit_is_empty() {
    let harness = Harness::new();
    let batch = vec![link_up(), link_down(), ranging_timeout()];

    let mut ledger = harness.open_ledger();
    let report = commit(&batch, &mut ledger);
    assert!(report.is_complete());
    ledger.close().unwrap();

    let reopened = harness.open_ledger();
    assert!(prune(&batch, &reopened).is_empty());
}

#[test]
fn union_is_independent_of_commit_order_and_repeats() {
    let all = bucket_batch(6);
    let (b1, rest) = all.split_at(2);
    let (b2, b3) = rest.split_at(2);
    let expected: FingerprintSet = all.iter().map(fingerprint).collect();
    let key = all[0].bucket_key();

    let orders: [&[&[EventLogRecord]]; 3] = [
        &[b1, b2, b3],
        &[b3, b1, b2, b1],
        &[b2, b2, b3, b1, b3],
    ];
    for order in orders {
        let harness = Harness::new();
        for batch in order {
            // Fresh handle per commit, as each cycle opens its own.
            let mut ledger = harness.open_ledger();
            commit(batch, &mut ledger);
        }
        assert_eq!(harness.open_ledger().get(&key), expected);
    }
}

#[test]
fn failed_bucket_does_not_block_sibling() {
    let harness = Harness::new();
    let x = link_up();
    let y = link_down();
    let mut ledger = FaultyLedger::new(harness.open_ledger());
    ledger.failing.insert(x.bucket_key());

    let report = commit(&[x.clone(), y.clone()], &mut ledger);

    assert_eq!(report.failed, vec![x.bucket_key()]);
    assert_eq!(report.written, vec![y.bucket_key()]);
    drop(ledger);
    let store = harness.open_ledger();
    assert!(store.get(&x.bucket_key()).is_empty());
    assert!(store.get(&y.bucket_key()).contains(&fingerprint(&y)));
}

#[test]
fn unreadable_bucket_keeps_its_recorded_fingerprints() {
    let harness = Harness::new();
    let mut ledger = FaultyLedger::new(harness.open_ledger());
    commit(&[link_up()], &mut ledger);

    let retry = EventLogRecord::new("2024-01-01 00:00:00", 7, 3, "link up (retry)");
    ledger.unreadable.insert(retry.bucket_key());
    let report = commit(std::slice::from_ref(&retry), &mut ledger);

    assert_eq!(report.failed, vec![retry.bucket_key()]);
    assert!(report.written.is_empty());
    drop(ledger);
    let stored = harness.open_ledger().get(&link_up().bucket_key());
    assert_eq!(stored, FingerprintSet::from([fingerprint(&link_up())]));
}

#[test]
fn stored_fingerprints_match_recomputed_ones_after_reopen() {
    let harness = Harness::new();
    let mut ledger = harness.open_ledger();
    commit(&[link_up()], &mut ledger);
    ledger.close().unwrap();

    let stored = harness.open_ledger().get(&link_up().bucket_key());
    let recomputed = fingerprint(&link_up());
    assert_eq!(stored, FingerprintSet::from([recomputed.clone()]));
    assert!(recomputed.as_str().len() <= Fingerprint::MAX_HEX_LEN);
}

#[test]
fn in_memory_and_file_stores_agree() {
    let harness = Harness::new();
    let batch = bucket_batch(3);
    let mut file = harness.open_ledger();
    let mut memory = LedgerStore::open_in_memory().unwrap();

    commit(&batch, &mut file);
    commit(&batch, &mut memory);

    let key = batch[0].bucket_key();
    assert_eq!(file.get(&key), memory.get(&key));
}
