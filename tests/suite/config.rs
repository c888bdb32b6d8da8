//! Engines built from TOML configuration.

use std::sync::Arc;

use modem_config::{ConfigError, ScraperConfig};
use modem_engine::{CycleMetrics, CycleStage, DedupMode, Engine};
use modem_types::EventLogRecord;

use crate::common::{Harness, link_down, link_up, write_snapshot};

fn write_config(harness: &Harness, body: &str) -> std::path::PathBuf {
    let path = harness.dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn configured_engine_forwards_to_jsonl_once() {
    let harness = Harness::new();
    let out = harness.dir.path().join("events.jsonl");
    let config_path = write_config(
        &harness,
        &format!(
            r"
[polling]
interval_secs = 60

[ledger]
path = '{ledger}'

[collector]
snapshot_path = '{snapshot}'

[sinks.log]
enabled = false

[sinks.jsonl]
enabled = true
path = '{out}'
",
            ledger = harness.ledger.display(),
            snapshot = harness.snapshot.display(),
            out = out.display(),
        ),
    );
    write_snapshot(&harness.snapshot, &[link_up(), link_down()]);

    let config = ScraperConfig::load(Some(&config_path)).unwrap();
    let engine = Engine::from_config(&config, Arc::new(CycleMetrics::new())).unwrap();
    assert_eq!(engine.dedup(), &DedupMode::Ledger(harness.ledger.clone()));

    let first = engine.run_cycle().unwrap();
    let second = engine.run_cycle().unwrap();

    assert_eq!(first.stage, CycleStage::Committed);
    assert_eq!(first.delivered_to, vec!["jsonl".to_string()]);
    assert_eq!(second.novel, 0);
    let lines: Vec<EventLogRecord> = std::fs::read_to_string(&out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines, vec![link_up(), link_down()]);
    assert_eq!(engine.metrics().snapshot().buckets_committed, 2);
}

#[test]
fn disabled_ledger_resends_every_cycle() {
    let harness = Harness::new();
    let out = harness.dir.path().join("events.jsonl");
    let config_path = write_config(
        &harness,
        &format!(
            r"
[ledger]
enabled = false

[collector]
snapshot_path = '{snapshot}'

[sinks.jsonl]
enabled = true
path = '{out}'
",
            snapshot = harness.snapshot.display(),
            out = out.display(),
        ),
    );
    write_snapshot(&harness.snapshot, &[link_up()]);

    let config = ScraperConfig::load(Some(&config_path)).unwrap();
    let engine = Engine::from_config(&config, Arc::new(CycleMetrics::new())).unwrap();
    engine.run_cycle().unwrap();
    engine.run_cycle().unwrap();

    assert_eq!(std::fs::read_to_string(&out).unwrap().lines().count(), 2);
    assert!(!harness.ledger.exists());
}

#[test]
fn zero_interval_is_rejected() {
    let harness = Harness::new();
    let config_path = write_config(&harness, "[polling]\ninterval_secs = 0\n");

    let err = ScraperConfig::load(Some(&config_path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
    assert_eq!(err.path(), config_path.as_path());
}

#[test]
fn explicit_missing_config_is_an_error() {
    let harness = Harness::new();
    let missing = harness.dir.path().join("absent.toml");

    let err = ScraperConfig::load(Some(&missing)).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
