//! The sessions inventory file - the pivot data structure between
//! discovery, fingerprinting and collection.
//!
//! Discovery writes it, fingerprinting mutates it in place, collection
//! reads it. Single writer per run.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read inventory {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write inventory {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid inventory {path}: {message}")]
    Format { path: String, message: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionsFile {
    pub folders: Vec<InventoryFolder>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InventoryFolder {
    pub folder_name: String,
    pub sessions: Vec<InventorySession>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventorySession {
    pub name: String,
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Normalized platform id (cisco_ios, ...). Empty until fingerprinted.
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub software_version: String,
    #[serde(default)]
    pub fingerprinted: bool,
    #[serde(default)]
    pub fingerprint_timestamp: String,
    /// Index into the CRED_N_* environment credential slots.
    #[serde(default = "default_credsid")]
    pub credsid: u8,
}

fn default_port() -> u16 {
    22
}

fn default_credsid() -> u8 {
    1
}

impl InventorySession {
    pub fn new(name: &str, ip: &str) -> Self {
        Self {
            name: name.to_string(),
            ip: ip.to_string(),
            port: 22,
            device_type: String::new(),
            vendor: String::new(),
            platform: String::new(),
            model: String::new(),
            software_version: String::new(),
            fingerprinted: false,
            fingerprint_timestamp: String::new(),
            credsid: 1,
        }
    }
}

impl SessionsFile {
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let text = std::fs::read_to_string(path).map_err(|e| InventoryError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_yaml::from_str(&text).map_err(|e| InventoryError::Format {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), InventoryError> {
        let write = |e| InventoryError::Write {
            path: path.display().to_string(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write)?;
        }
        let text = serde_yaml::to_string(self).map_err(|e| InventoryError::Format {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(write)
    }

    pub fn all_sessions(&self) -> impl Iterator<Item = &InventorySession> {
        self.folders.iter().flat_map(|f| f.sessions.iter())
    }

    pub fn session_count(&self) -> usize {
        self.folders.iter().map(|f| f.sessions.len()).sum()
    }

    /// Mutable lookup by session name (case-insensitive).
    pub fn session_mut(&mut self, name: &str) -> Option<&mut InventorySession> {
        let wanted = name.to_lowercase();
        self.folders
            .iter_mut()
            .flat_map(|f| f.sessions.iter_mut())
            .find(|s| s.name.to_lowercase() == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.yaml");

        let mut file = SessionsFile::default();
        file.folders.push(InventoryFolder {
            folder_name: "lab".into(),
            sessions: vec![
                InventorySession::new("core1.lab", "10.0.0.1"),
                InventorySession::new("edge1.lab", "10.0.0.2"),
            ],
        });
        file.save(&path).unwrap();

        let loaded = SessionsFile::load(&path).unwrap();
        assert_eq!(loaded, file);
        assert_eq!(loaded.session_count(), 2);
    }

    #[test]
    fn session_mut_updates_in_place() {
        let mut file = SessionsFile {
            folders: vec![InventoryFolder {
                folder_name: "lab".into(),
                sessions: vec![InventorySession::new("Core1.Lab", "10.0.0.1")],
            }],
        };
        let session = file.session_mut("core1.lab").unwrap();
        session.device_type = "cisco_ios".into();
        session.fingerprinted = true;
        assert!(file.all_sessions().next().unwrap().fingerprinted);
    }

    #[test]
    fn missing_fields_default_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.yaml");
        std::fs::write(
            &path,
            "folders:\n- folder_name: lab\n  sessions:\n  - name: sw1\n    ip: 10.0.0.9\n",
        )
        .unwrap();
        let loaded = SessionsFile::load(&path).unwrap();
        let session = loaded.all_sessions().next().unwrap();
        assert_eq!(session.port, 22);
        assert_eq!(session.credsid, 1);
        assert!(!session.fingerprinted);
    }
}
