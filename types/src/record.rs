use std::fmt;

use serde::{Deserialize, Serialize};

/// One line of the device's event log, as scraped.
///
/// `timestamp` is kept verbatim in the device's own format. It is not unique:
/// several events routinely share the same second.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogRecord {
    pub timestamp: String,
    pub event_id: i64,
    pub event_level: i64,
    pub description: String,
}

impl EventLogRecord {
    pub fn new(
        timestamp: impl Into<String>,
        event_id: i64,
        event_level: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            event_id,
            event_level,
            description: description.into(),
        }
    }

    /// The ledger bucket this record is filed under.
    #[must_use]
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey::new(self.timestamp.clone())
    }
}

/// Ledger index: a record's timestamp string, byte for byte.
///
/// Only an index to keep per-key fingerprint sets small. Two records share a
/// bucket iff their timestamps are identical; no time-window meaning applies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketKey(String);

impl BucketKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BucketKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
