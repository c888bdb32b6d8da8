//! Ledger Store - durable bucket key -> fingerprint set table.
//!
//! One SQLite table, `EventLogs`, keyed by the verbatim device timestamp. Each
//! value is a JSON array of fingerprint strings. The store only offers full
//! overwrite per key; additive semantics are built on top in [`crate::commit`].
//!
//! A store is opened at the start of a cycle and dropped (or [`LedgerStore::close`]d)
//! at its end. No handle outlives a cycle.

use std::path::{Path, PathBuf};

use modem_types::{BucketKey, Fingerprint, FingerprintSet};
use rusqlite::{Connection, OptionalExtension, params};

use crate::LedgerError;
use crate::fs_security::prepare_ledger_file;

/// Read/overwrite access to bucket fingerprint sets.
///
/// `prune` and `commit` are written against this trait so the merge logic is
/// independent of the storage engine.
pub trait Ledger {
    /// Fingerprints recorded under `bucket`.
    ///
    /// Absent keys and undecodable values both yield the empty set. Only a
    /// failure to query the store is an error; callers that write must not
    /// treat it as an empty bucket.
    fn load(&self, bucket: &BucketKey) -> Result<FingerprintSet, LedgerError>;

    /// Replace the set stored under `bucket`.
    fn put(&mut self, bucket: &BucketKey, fingerprints: &FingerprintSet)
    -> Result<(), LedgerError>;

    /// Lenient [`Ledger::load`] for read-only callers: a store failure is
    /// logged and the bucket reads as empty.
    fn get(&self, bucket: &BucketKey) -> FingerprintSet {
        self.load(bucket).unwrap_or_else(|err| {
            tracing::warn!(
                op = "ledger.get",
                bucket = %bucket,
                error = %err,
                "Treating unreadable ledger bucket as empty"
            );
            FingerprintSet::new()
        })
    }
}

/// SQLite-backed ledger.
pub struct LedgerStore {
    db: Connection,
    path: PathBuf,
}

impl LedgerStore {
    /// Well-known table holding every bucket.
    pub const TABLE: &'static str = "EventLogs";

    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS EventLogs (
            bucket_key TEXT PRIMARY KEY NOT NULL,
            fingerprints TEXT NOT NULL
        );
    ";

    /// Open or create the ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        prepare_ledger_file(path).map_err(|e| LedgerError::store_init(path, e))?;

        let db = Connection::open(path).map_err(|e| LedgerError::store_init(path, e))?;
        Self::initialize(db, path.to_path_buf())
    }

    /// Open an in-memory ledger (for testing).
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let path = PathBuf::from(":memory:");
        let db = Connection::open_in_memory().map_err(|e| LedgerError::store_init(&path, e))?;
        Self::initialize(db, path)
    }

    fn initialize(db: Connection, path: PathBuf) -> Result<Self, LedgerError> {
        db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")
            .map_err(|e| LedgerError::store_init(&path, e))?;
        let store = Self { db, path };
        store.ensure_table()?;
        tracing::debug!(op = "ledger.open", path = %store.path.display(), "Ledger opened");
        Ok(store)
    }

    /// Create the `EventLogs` table if it does not exist. Idempotent.
    pub fn ensure_table(&self) -> Result<(), LedgerError> {
        self.db
            .execute_batch(Self::SCHEMA)
            .map_err(|e| LedgerError::store_init(&self.path, e))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict read: `Ok(None)` for an absent key, `Err(BucketQuery)` when the
    /// store cannot be queried, `Err(BucketRead)` for a value that does not decode.
    pub fn read_bucket(&self, bucket: &BucketKey) -> Result<Option<FingerprintSet>, LedgerError> {
        let raw: Option<String> = self
            .db
            .query_row(
                "SELECT fingerprints FROM EventLogs WHERE bucket_key = ?1",
                [bucket.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| LedgerError::bucket_query(bucket, e))?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        // Duplicates in the stored array collapse into the set.
        let decoded: Vec<Fingerprint> =
            serde_json::from_str(&raw).map_err(|e| LedgerError::bucket_read(bucket, e))?;
        Ok(Some(decoded.into_iter().collect()))
    }

    #[cfg(test)]
    pub(crate) fn bucket_count(&self) -> rusqlite::Result<usize> {
        self.db
            .query_row("SELECT COUNT(*) FROM EventLogs", [], |row| row.get::<_, i64>(0))
            .map(|count| count as usize)
    }

    /// Release the database handle, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<(), LedgerError> {
        let Self { db, path } = self;
        db.close().map_err(|(_, source)| LedgerError::Close { path, source })
    }
}

impl Ledger for LedgerStore {
    fn load(&self, bucket: &BucketKey) -> Result<FingerprintSet, LedgerError> {
        match self.read_bucket(bucket) {
            Ok(set) => Ok(set.unwrap_or_default()),
            Err(err @ LedgerError::BucketRead { .. }) => {
                tracing::warn!(
                    op = "ledger.load",
                    bucket = %bucket,
                    error = %err,
                    "Treating undecodable ledger bucket as empty"
                );
                Ok(FingerprintSet::new())
            }
            Err(err) => Err(err),
        }
    }

    fn put(
        &mut self,
        bucket: &BucketKey,
        fingerprints: &FingerprintSet,
    ) -> Result<(), LedgerError> {
        // BTreeSet serializes in sorted order, so equal sets encode identically.
        let encoded =
            serde_json::to_string(fingerprints).map_err(|e| LedgerError::bucket_write(bucket, e))?;

        self.db
            .execute(
                "INSERT INTO EventLogs (bucket_key, fingerprints) VALUES (?1, ?2)
                 ON CONFLICT(bucket_key) DO UPDATE SET fingerprints = excluded.fingerprints",
                params![bucket.as_str(), encoded],
            )
            .map_err(|e| LedgerError::bucket_write(bucket, e))?;
        Ok(())
    }
}
