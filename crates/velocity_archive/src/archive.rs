//! The archive decision procedure.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use velocity_db::{AssetsDb, DbError};
use velocity_protocol::paths::DataLayout;
use velocity_protocol::{CaptureType, Severity, SeverityThresholds};

use crate::diff::{count_changed_lines, normalize_for_diff, unified_diff};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("failed to read capture {path}: {source}")]
    ReadCapture {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write diff {path}: {source}")]
    WriteDiff {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("capture type {0} is not tracked")]
    NotTracked(CaptureType),
}

/// What happened to one (device, capture) load.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveOutcome {
    /// First snapshot for this (device, type); no change record.
    Baseline { snapshot_id: i64 },
    /// Content hash matched the latest snapshot; nothing written.
    Unchanged,
    /// New snapshot and change record.
    Changed {
        snapshot_id: i64,
        change_id: i64,
        lines_added: i64,
        lines_removed: i64,
        severity: Severity,
    },
    /// Content differed only in filtered noise; snapshot kept for history,
    /// no change record.
    NoiseOnly { snapshot_id: i64 },
}

impl ArchiveOutcome {
    pub fn is_change(&self) -> bool {
        matches!(self, ArchiveOutcome::Changed { .. })
    }
}

pub struct CaptureArchive {
    db: AssetsDb,
    layout: DataLayout,
    thresholds: SeverityThresholds,
}

impl CaptureArchive {
    pub fn new(db: AssetsDb, layout: DataLayout, thresholds: SeverityThresholds) -> Self {
        Self {
            db,
            layout,
            thresholds,
        }
    }

    /// Archive one capture file for a tracked type.
    pub async fn archive_file(
        &self,
        device_id: i64,
        capture_type: CaptureType,
        file_path: &Path,
        captured_at: DateTime<Utc>,
    ) -> Result<ArchiveOutcome, ArchiveError> {
        let content =
            std::fs::read_to_string(file_path).map_err(|e| ArchiveError::ReadCapture {
                path: file_path.display().to_string(),
                source: e,
            })?;
        self.archive_content(
            device_id,
            capture_type,
            &content,
            &file_path.display().to_string(),
            captured_at,
        )
        .await
    }

    /// Core decision procedure over in-memory content.
    pub async fn archive_content(
        &self,
        device_id: i64,
        capture_type: CaptureType,
        content: &str,
        file_path: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<ArchiveOutcome, ArchiveError> {
        if !capture_type.is_tracked() {
            return Err(ArchiveError::NotTracked(capture_type));
        }

        let content_hash = sha256_hex(content);
        let previous = self.db.latest_snapshot(device_id, capture_type).await?;

        if let Some(prev) = &previous {
            if prev.content_hash == content_hash {
                debug!(device_id, capture_type = %capture_type, "content unchanged");
                return Ok(ArchiveOutcome::Unchanged);
            }
        }

        let (snapshot_id, inserted) = self
            .db
            .insert_snapshot(
                device_id,
                capture_type,
                captured_at,
                file_path,
                content,
                &content_hash,
            )
            .await?;
        if !inserted {
            // Concurrent loader won the race on the same content.
            return Ok(ArchiveOutcome::Unchanged);
        }

        let Some(prev) = previous else {
            info!(device_id, capture_type = %capture_type, snapshot_id, "baseline snapshot");
            return Ok(ArchiveOutcome::Baseline { snapshot_id });
        };

        let old = normalize_for_diff(&prev.content, capture_type);
        let new = normalize_for_diff(content, capture_type);
        let diff = unified_diff(&old, &new);
        if diff.trim().is_empty() {
            debug!(device_id, capture_type = %capture_type, "noise-only change");
            return Ok(ArchiveOutcome::NoiseOnly { snapshot_id });
        }

        let (lines_added, lines_removed) = count_changed_lines(&diff);
        let severity =
            Severity::classify(capture_type, lines_added, lines_removed, &self.thresholds);
        let diff_path = self.save_diff(device_id, capture_type, captured_at, &diff)?;

        let change_id = self
            .db
            .insert_change(
                device_id,
                capture_type,
                Some(prev.id),
                snapshot_id,
                lines_added,
                lines_removed,
                Some(&diff_path),
                severity,
            )
            .await?;

        info!(
            device_id,
            capture_type = %capture_type,
            lines_added,
            lines_removed,
            severity = %severity,
            "change detected"
        );

        Ok(ArchiveOutcome::Changed {
            snapshot_id,
            change_id,
            lines_added,
            lines_removed,
            severity,
        })
    }

    /// Write the diff under `diffs/{device_id}/{type}/{timestamp}.diff` and
    /// return the path relative to the data dir (resolvable by any reader
    /// as `data_dir / diff_path`).
    fn save_diff(
        &self,
        device_id: i64,
        capture_type: CaptureType,
        captured_at: DateTime<Utc>,
        diff: &str,
    ) -> Result<String, ArchiveError> {
        let dir = self.layout.diff_dir(device_id, capture_type);
        let write_err = |path: &Path, e| ArchiveError::WriteDiff {
            path: path.display().to_string(),
            source: e,
        };
        std::fs::create_dir_all(&dir).map_err(|e| write_err(&dir, e))?;

        let file = dir.join(format!("{}.diff", captured_at.format("%Y%m%d_%H%M%S")));
        std::fs::write(&file, diff).map_err(|e| write_err(&file, e))?;

        let relative = file
            .strip_prefix(self.layout.base())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| file.display().to_string());
        Ok(relative)
    }
}

fn sha256_hex(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use velocity_db::DeviceUpsert;
    use velocity_testkit::fixtures;

    async fn setup() -> (CaptureArchive, AssetsDb, i64, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let db = AssetsDb::open_in_memory().await.unwrap();
        let device_id = db
            .upsert_device(&DeviceUpsert {
                name: "sw2.lab".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let archive = CaptureArchive::new(db.clone(), layout, SeverityThresholds::default());
        (archive, db, device_id, dir)
    }

    #[tokio::test]
    async fn baseline_then_change_then_dedup() {
        let (archive, db, device, _dir) = setup().await;
        let v1 = fixtures::running_config("sw2.lab", &[]);

        let outcome = archive
            .archive_content(device, CaptureType::Configs, &v1, "configs/sw2.lab.txt", Utc::now())
            .await
            .unwrap();
        assert!(matches!(outcome, ArchiveOutcome::Baseline { .. }));
        assert_eq!(db.change_count().await.unwrap(), 0);

        // Same content again: fully deduplicated.
        let outcome = archive
            .archive_content(device, CaptureType::Configs, &v1, "configs/sw2.lab.txt", Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome, ArchiveOutcome::Unchanged);
        assert_eq!(db.snapshot_count().await.unwrap(), 1);

        // 12 added, 3 removed: moderate.
        let added: Vec<String> = (0..12).map(|i| format!("snmp-server community ro{}", i)).collect();
        let added_refs: Vec<&str> = added.iter().map(String::as_str).collect();
        let v2 = fixtures::running_config("sw2.lab", &added_refs)
            .replace("interface Vlan20\n ip address 10.10.20.1 255.255.255.0\n!\n", "");
        let outcome = archive
            .archive_content(device, CaptureType::Configs, &v2, "configs/sw2.lab.txt", Utc::now())
            .await
            .unwrap();
        let ArchiveOutcome::Changed {
            lines_added,
            lines_removed,
            severity,
            ..
        } = outcome
        else {
            panic!("expected a change, got {:?}", outcome);
        };
        assert_eq!(lines_added, 12);
        assert_eq!(lines_removed, 3);
        assert_eq!(severity, Severity::Moderate);
        assert_eq!(db.snapshot_count().await.unwrap(), 2);
        assert_eq!(db.change_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn version_change_is_critical() {
        let (archive, db, device, _dir) = setup().await;
        let v1 = fixtures::cisco_show_version("sw2.lab", "15.6(2)T", "FCW1111A1AA");
        let v2 = fixtures::cisco_show_version("sw2.lab", "17.9.6a", "FCW1111A1AA");

        archive
            .archive_content(device, CaptureType::Version, &v1, "version/sw2.lab.txt", Utc::now())
            .await
            .unwrap();
        let outcome = archive
            .archive_content(device, CaptureType::Version, &v2, "version/sw2.lab.txt", Utc::now())
            .await
            .unwrap();

        let ArchiveOutcome::Changed {
            lines_added,
            lines_removed,
            severity,
            ..
        } = outcome
        else {
            panic!("expected a change");
        };
        assert_eq!(severity, Severity::Critical);
        assert_eq!(lines_added, 1);
        assert_eq!(lines_removed, 1);
        assert_eq!(db.change_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn diff_file_lands_under_device_and_type() {
        let (archive, _db, device, dir) = setup().await;
        let now = Utc::now();
        archive
            .archive_content(device, CaptureType::Configs, "a\n", "configs/sw2.lab.txt", now)
            .await
            .unwrap();
        let outcome = archive
            .archive_content(device, CaptureType::Configs, "b\n", "configs/sw2.lab.txt", now)
            .await
            .unwrap();
        let ArchiveOutcome::Changed { .. } = outcome else {
            panic!("expected change");
        };

        let diff_dir = dir
            .path()
            .join("diffs")
            .join(device.to_string())
            .join("configs");
        let entries: Vec<_> = std::fs::read_dir(&diff_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].as_ref().unwrap().file_name();
        assert!(name.to_string_lossy().ends_with(".diff"));
    }

    #[tokio::test]
    async fn noise_only_difference_emits_no_change() {
        let (archive, db, device, _dir) = setup().await;
        let v1 = "Building configuration...\nhostname sw2.lab\nend\n";
        let v2 = "! Last configuration change at 09:00\nhostname sw2.lab\nend\n";

        archive
            .archive_content(device, CaptureType::Configs, v1, "configs/sw2.lab.txt", Utc::now())
            .await
            .unwrap();
        let outcome = archive
            .archive_content(device, CaptureType::Configs, v2, "configs/sw2.lab.txt", Utc::now())
            .await
            .unwrap();
        assert!(matches!(outcome, ArchiveOutcome::NoiseOnly { .. }));
        assert_eq!(db.change_count().await.unwrap(), 0);
        // History still records the raw variant.
        assert_eq!(db.snapshot_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn untracked_types_are_rejected() {
        let (archive, _db, device, _dir) = setup().await;
        let err = archive
            .archive_content(device, CaptureType::Arp, "x", "arp/sw2.lab.txt", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NotTracked(CaptureType::Arp)));
    }
}
