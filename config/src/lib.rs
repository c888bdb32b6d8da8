//! Configuration for modem-scraper.
//!
//! Loaded once at startup from `~/.modem-scraper/config.toml` (or `--config PATH`).
//! Every section is optional; a missing default file means built-in defaults.
//!
//! ```toml
//! [polling]
//! interval_secs = 300
//!
//! [ledger]
//! enabled = true
//! path = "~/.modem-scraper/ledger.db"
//!
//! [collector]
//! snapshot_path = "/var/lib/modem-scraper/eventlog.json"
//!
//! [sinks.log]
//! enabled = true
//!
//! [sinks.jsonl]
//! enabled = true
//! path = "${STATE_DIR}/forwarded.jsonl"
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const APP_DIR: &str = ".modem-scraper";

// Default value function for serde (bool::default() is false, so only true needs a fn)
const fn default_true() -> bool {
    true
}

const fn default_interval_secs() -> u64 {
    300
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config at {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScraperConfig {
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub sinks: SinksConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    /// Seconds between cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

/// Dedup ledger settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// When false, dedup is bypassed and every record is forwarded every cycle.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Database location. Defaults to `~/.modem-scraper/ledger.db`.
    pub path: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl LedgerConfig {
    /// Resolved ledger path, or `None` when no home directory is known and no
    /// path was configured.
    #[must_use]
    pub fn resolved_path(&self) -> Option<PathBuf> {
        match &self.path {
            Some(raw) => Some(resolve_path(raw)),
            None => app_dir().map(|dir| dir.join("ledger.db")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorConfig {
    /// JSON array of event log records written by the scraper.
    pub snapshot_path: Option<String>,
}

impl CollectorConfig {
    #[must_use]
    pub fn resolved_snapshot_path(&self) -> Option<PathBuf> {
        self.snapshot_path.as_deref().map(resolve_path)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinksConfig {
    #[serde(default)]
    pub log: LogSinkConfig,
    #[serde(default)]
    pub jsonl: JsonlSinkConfig,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            log: LogSinkConfig { enabled: true },
            jsonl: JsonlSinkConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSinkConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonlSinkConfig {
    #[serde(default)]
    pub enabled: bool,
    pub path: Option<String>,
}

impl JsonlSinkConfig {
    #[must_use]
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.as_deref().map(resolve_path)
    }
}

impl ScraperConfig {
    /// Load configuration.
    ///
    /// With an explicit path the file must exist. Without one, the default
    /// location is tried and its absence yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path).map_err(|source| {
            tracing::warn!("Failed to read config at {:?}: {}", path, source);
            ConfigError::Read {
                path: path.clone(),
                source,
            }
        })?;

        Self::parse(&content, &path)
    }

    /// Parse and validate TOML text. `origin` is only used in errors.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| {
            tracing::warn!("Failed to parse config at {:?}: {}", origin, source);
            ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            }
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    fn validate(&self, origin: &Path) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            path: origin.to_path_buf(),
            reason: reason.to_string(),
        };

        if self.polling.interval_secs == 0 {
            return Err(invalid("polling.interval_secs must be greater than zero"));
        }
        if self.sinks.jsonl.enabled && self.sinks.jsonl.path.is_none() {
            return Err(invalid("sinks.jsonl.path is required when sinks.jsonl is enabled"));
        }
        Ok(())
    }
}

/// Default config file location: `~/.modem-scraper/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join("config.toml"))
}

fn app_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DIR))
}

/// Expand `${VAR}` references and a leading `~/`.
#[must_use]
pub fn resolve_path(raw: &str) -> PathBuf {
    let expanded = expand_env_vars(raw);
    if let Some(rest) = expanded.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(expanded)
}

/// Replace `${VAR}` with the variable's value (empty if unset). An unclosed
/// `${` is kept verbatim.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
