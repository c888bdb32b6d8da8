use std::error::Error as StdError;
use std::path::PathBuf;

use modem_types::BucketKey;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger could not be opened, or its table could not be ensured.
    /// Fatal for the current cycle only.
    #[error("failed to initialize ledger at {}: {source}", path.display())]
    StoreInit {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    /// The store could not be queried for a bucket (busy, I/O).
    ///
    /// Commit skips the bucket's write; the stored set is left as it was.
    #[error("failed to query ledger bucket '{bucket}': {source}")]
    BucketQuery {
        bucket: BucketKey,
        #[source]
        source: BoxError,
    },
    /// A stored bucket value could not be decoded.
    ///
    /// Never surfaced by [`crate::Ledger::load`]; the bucket is treated as empty.
    #[error("failed to decode ledger bucket '{bucket}': {source}")]
    BucketRead {
        bucket: BucketKey,
        #[source]
        source: BoxError,
    },
    /// Encoding or writing one bucket failed. Other buckets are unaffected.
    #[error("failed to write ledger bucket '{bucket}': {source}")]
    BucketWrite {
        bucket: BucketKey,
        #[source]
        source: BoxError,
    },
    #[error("failed to close ledger at {}: {source}", path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

impl LedgerError {
    pub(crate) fn store_init(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::StoreInit {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn bucket_query(bucket: &BucketKey, source: impl Into<BoxError>) -> Self {
        Self::BucketQuery {
            bucket: bucket.clone(),
            source: source.into(),
        }
    }

    pub(crate) fn bucket_read(bucket: &BucketKey, source: impl Into<BoxError>) -> Self {
        Self::BucketRead {
            bucket: bucket.clone(),
            source: source.into(),
        }
    }

    pub(crate) fn bucket_write(bucket: &BucketKey, source: impl Into<BoxError>) -> Self {
        Self::BucketWrite {
            bucket: bucket.clone(),
            source: source.into(),
        }
    }

    /// Bucket-level errors are recoverable within a cycle; everything else aborts it.
    #[must_use]
    pub fn is_cycle_fatal(&self) -> bool {
        matches!(self, Self::StoreInit { .. })
    }
}
