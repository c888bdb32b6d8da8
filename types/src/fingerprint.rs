//! Content fingerprints for event log records.
//!
//! A fingerprint is XXH64 (seed 0) over `timestamp ‖ event_id ‖ event_level ‖ description`
//! (integers rendered in decimal, no separators), as lowercase hex without
//! leading zeros. Ledgers written by earlier deployments use the same
//! rendering; changing it orphans every fingerprint already stored.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::EventLogRecord;

/// Hex-encoded XXH64 digest identifying one event occurrence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

/// Set of fingerprints stored under one bucket key.
pub type FingerprintSet = BTreeSet<Fingerprint>;

impl Fingerprint {
    /// Longest hex rendering; shorter when the digest has leading zero nibbles.
    pub const MAX_HEX_LEN: usize = 16;

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Compute the fingerprint of a record. Pure and deterministic.
#[must_use]
pub fn fingerprint(record: &EventLogRecord) -> Fingerprint {
    let concat = format!(
        "{}{}{}{}",
        record.timestamp, record.event_id, record.event_level, record.description
    );
    Fingerprint(format!("{:x}", XxHash64::oneshot(0, concat.as_bytes())))
}
