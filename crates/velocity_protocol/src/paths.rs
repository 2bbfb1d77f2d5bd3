//! Data-directory resolution and layout.
//!
//! Everything the system persists lives under one base directory:
//!
//! ```text
//! DATA_DIR/
//!   assets.db  arp_cat.db  users.db  config.toml
//!   capture/<type>/<hostname>.txt
//!   diffs/<device_id>/<type>/<timestamp>.diff
//!   discovery/sessions.yaml  discovery/network.json
//!   logs/
//! ```
//!
//! Resolution: `DATA_DIR` env var, else `~/.velocitycmdb/data`. Lookup never
//! creates directories; `ensure_layout` does that explicitly.

use std::io;
use std::path::{Path, PathBuf};

use crate::types::CaptureType;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const CONFIG_ENV: &str = "CONFIG";

/// Resolve the base data directory.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".velocitycmdb")
        .join("data")
}

/// Layout helper bound to a concrete base directory so components never
/// consult process-wide state after startup.
#[derive(Debug, Clone)]
pub struct DataLayout {
    base: PathBuf,
}

impl DataLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Layout at the environment-resolved location.
    pub fn resolve() -> Self {
        Self::new(data_dir())
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn assets_db(&self) -> PathBuf {
        self.base.join("assets.db")
    }

    pub fn arp_cat_db(&self) -> PathBuf {
        self.base.join("arp_cat.db")
    }

    pub fn users_db(&self) -> PathBuf {
        self.base.join("users.db")
    }

    pub fn config_file(&self) -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        self.base.join("config.toml")
    }

    pub fn capture_root(&self) -> PathBuf {
        self.base.join("capture")
    }

    pub fn capture_dir(&self, capture_type: CaptureType) -> PathBuf {
        self.capture_root().join(capture_type.output_dir())
    }

    pub fn capture_file(&self, capture_type: CaptureType, normalized_name: &str) -> PathBuf {
        self.capture_dir(capture_type)
            .join(format!("{}.txt", normalized_name))
    }

    pub fn diffs_root(&self) -> PathBuf {
        self.base.join("diffs")
    }

    pub fn diff_dir(&self, device_id: i64, capture_type: CaptureType) -> PathBuf {
        self.diffs_root()
            .join(device_id.to_string())
            .join(capture_type.output_dir())
    }

    pub fn discovery_dir(&self) -> PathBuf {
        self.base.join("discovery")
    }

    pub fn sessions_file(&self) -> PathBuf {
        self.discovery_dir().join("sessions.yaml")
    }

    pub fn topology_file(&self) -> PathBuf {
        self.discovery_dir().join("network.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    /// Create the directory skeleton. Idempotent.
    pub fn ensure_layout(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::create_dir_all(self.capture_root())?;
        for ct in CaptureType::ALL {
            std::fs::create_dir_all(self.capture_dir(*ct))?;
        }
        std::fs::create_dir_all(self.diffs_root())?;
        std::fs::create_dir_all(self.discovery_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }

    /// True when `init` has already run here.
    pub fn is_initialized(&self) -> bool {
        self.assets_db().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_stable() {
        let layout = DataLayout::new("/tmp/velocity-test");
        assert_eq!(
            layout.capture_file(CaptureType::Configs, "core1.iad2"),
            PathBuf::from("/tmp/velocity-test/capture/configs/core1.iad2.txt")
        );
        assert_eq!(
            layout.diff_dir(7, CaptureType::Version),
            PathBuf::from("/tmp/velocity-test/diffs/7/version")
        );
    }

    #[test]
    fn ensure_layout_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.ensure_layout().unwrap();
        layout.ensure_layout().unwrap();
        assert!(layout.capture_dir(CaptureType::Arp).is_dir());
        assert!(layout.discovery_dir().is_dir());
    }
}
