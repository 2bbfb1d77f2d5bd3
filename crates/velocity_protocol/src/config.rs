//! Core configuration.
//!
//! Loaded from `DATA_DIR/config.toml` (or the `CONFIG` env override). Every
//! field has a compiled default; a missing file means defaults, a malformed
//! file is an error. Template score minimums and severity thresholds are
//! configuration, not constants.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::types::CaptureType;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CoreConfig {
    pub ssh: SshConfig,
    pub scoring: ScoringConfig,
    pub severity: SeverityThresholds,
    pub collection: CollectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// TCP + handshake timeout, seconds.
    pub connect_timeout_secs: u64,
    /// Per-command response timeout, seconds.
    pub command_timeout_secs: u64,
    /// Overall wall-clock cap for one job, seconds. 0 disables.
    pub job_timeout_secs: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            command_timeout_secs: 15,
            job_timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Per-capture-type minimum template scores, keyed by catalog name
    /// ("arp", "inventory", ...). Types without an entry use the catalog
    /// default (20, or 25 for ARP).
    pub min_score: BTreeMap<String, f64>,
}

impl ScoringConfig {
    pub fn threshold_for(&self, capture_type: CaptureType) -> f64 {
        self.min_score
            .get(capture_type.as_str())
            .copied()
            .unwrap_or_else(|| capture_type.default_min_score())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    /// configs changes above this many total lines are critical.
    pub configs_critical: i64,
    /// inventory changes above this many total lines are critical.
    pub inventory_critical: i64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            configs_critical: 50,
            inventory_critical: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Default SSH fan-out for collection runs.
    pub max_workers: usize,
    /// Default fan-out for fingerprint runs.
    pub fingerprint_workers: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            fingerprint_workers: 8,
        }
    }
}

/// Hard cap on worker fan-out. Throughput above ~20 concurrent sessions is
/// unmeasured; the old UI's 50 is not inherited.
pub const MAX_WORKERS_CAP: usize = 20;

impl CoreConfig {
    /// Load from a TOML file. Missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {message}")]
    Parse { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.ssh.connect_timeout_secs, 10);
        assert_eq!(cfg.ssh.command_timeout_secs, 15);
        assert_eq!(cfg.collection.max_workers, 5);
        assert_eq!(cfg.collection.fingerprint_workers, 8);
        assert_eq!(cfg.severity.configs_critical, 50);
        assert_eq!(cfg.severity.inventory_critical, 5);
        assert_eq!(cfg.scoring.threshold_for(CaptureType::Arp), 25.0);
        assert_eq!(cfg.scoring.threshold_for(CaptureType::Version), 20.0);
    }

    #[test]
    fn per_type_override_wins() {
        let mut cfg = CoreConfig::default();
        cfg.scoring.min_score.insert("arp".into(), 30.0);
        assert_eq!(cfg.scoring.threshold_for(CaptureType::Arp), 30.0);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: CoreConfig = toml::from_str(
            r#"
            [ssh]
            command_timeout_secs = 30

            [severity]
            configs_critical = 100
            "#,
        )
        .unwrap();
        assert_eq!(cfg.ssh.command_timeout_secs, 30);
        assert_eq!(cfg.ssh.connect_timeout_secs, 10);
        assert_eq!(cfg.severity.configs_critical, 100);
        assert_eq!(cfg.severity.inventory_critical, 5);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = CoreConfig::load(Path::new("/nonexistent/velocity/config.toml")).unwrap();
        assert_eq!(cfg.collection.max_workers, 5);
    }
}
