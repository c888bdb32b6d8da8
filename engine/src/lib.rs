//! Cycle orchestration for modem-scraper.
//!
//! Each cycle collects the device's current event log, prunes records the
//! ledger already knows, forwards the remainder to every configured sink, and
//! commits the forwarded fingerprints back to the ledger.
//!
//! The engine owns no schedule. The binary decides when to call
//! [`Engine::run_cycle`]; the engine only guarantees that two cycles never
//! overlap.

mod collector;
mod cycle;
mod metrics;
mod publisher;

pub use collector::{Collector, SnapshotCollector};
pub use cycle::{CycleError, CycleReport, CycleStage, DedupMode, Engine};
pub use metrics::{CycleMetrics, MetricsSnapshot};
pub use publisher::{JsonLinesPublisher, LogPublisher, Publisher};
