//! Event log deduplication ledger.
//!
//! The device re-serves its whole event log on every poll. This crate decides
//! which records are new since the last forward and durably remembers what has
//! been forwarded, across restarts.
//!
//! # Architecture
//!
//! ```text
//! LedgerStore (SQLite, table "EventLogs")
//! └── bucket key (record timestamp) -> JSON array of fingerprints
//!
//! prune(batch, &ledger)      read-only, returns novel records in input order
//! commit(batch, &mut ledger) per-bucket read -> union -> write
//! ```
//!
//! # Key Invariant
//!
//! **A bucket's fingerprint set only ever grows.** Commit never writes a set
//! that is missing a fingerprint it read, so repeating a commit, or committing
//! overlapping batches in any order, converges on the union.
//!
//! Callers must serialize cycles; nothing here guards against two cycles
//! merging the same bucket concurrently.

mod commit;
mod error;
mod fs_security;
mod prune;
mod store;

pub use commit::{CommitReport, commit, fingerprints_by_bucket};
pub use error::LedgerError;
pub use prune::prune;
pub use store::{Ledger, LedgerStore};
