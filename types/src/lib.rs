//! Core domain types for modem-scraper.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.
//!
//! The one piece of logic that lives here is [`fingerprint`]: pruning and committing
//! must agree on it byte-for-byte, so there is exactly one definition.

mod fingerprint;
mod record;

pub use fingerprint::{Fingerprint, FingerprintSet, fingerprint};
pub use record::{BucketKey, EventLogRecord};
