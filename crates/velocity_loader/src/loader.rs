//! The batch loader.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use velocity_db::{ArpCatDb, AssetsDb, CurrentCapture, DbError, Device};
use velocity_protocol::config::ScoringConfig;
use velocity_protocol::paths::DataLayout;
use velocity_protocol::{CaptureType, ParseTarget, Vendor};
use velocity_templates::{filter_list, TemplateIndex, TemplateMatch};

use crate::arp::entries_from_records;
use crate::components::components_from_records;
use crate::report::{FailureRecord, LoadReport};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("failed to list capture directory {path}: {source}")]
    ListDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub struct CaptureLoader {
    assets: AssetsDb,
    arp_cat: ArpCatDb,
    templates: Arc<TemplateIndex>,
    layout: DataLayout,
    scoring: ScoringConfig,
}

impl CaptureLoader {
    pub fn new(
        assets: AssetsDb,
        arp_cat: ArpCatDb,
        layout: DataLayout,
        scoring: ScoringConfig,
    ) -> Self {
        Self {
            assets,
            arp_cat,
            templates: Arc::new(TemplateIndex::builtin()),
            layout,
            scoring,
        }
    }

    pub fn with_templates(mut self, templates: TemplateIndex) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    /// Load every capture file for the given types. Per-file failures are
    /// collected in the report; only directory-level I/O errors surface.
    pub async fn load_capture_types(
        &self,
        types: &[CaptureType],
    ) -> Result<LoadReport, LoaderError> {
        let mut report = LoadReport::default();
        for capture_type in types {
            let dir = self.layout.capture_dir(*capture_type);
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "no capture directory, skipping");
                continue;
            }
            let mut files: Vec<_> = std::fs::read_dir(&dir)
                .map_err(|e| LoaderError::ListDir {
                    path: dir.display().to_string(),
                    source: e,
                })?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("txt"))
                .collect();
            files.sort();

            info!(capture_type = %capture_type, files = files.len(), "loading captures");
            for file in files {
                report.merge(self.load_file(*capture_type, &file).await);
            }
        }
        Ok(report)
    }

    /// Load a single capture file. Never propagates per-file errors.
    pub async fn load_file(&self, capture_type: CaptureType, path: &Path) -> LoadReport {
        let mut report = LoadReport::default();
        let file_label = path.display().to_string();

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            report.record_failure(FailureRecord {
                file: file_label,
                vendor: None,
                best_template: None,
                best_score: 0.0,
                reason: "unintelligible file name".to_string(),
            });
            return report;
        };

        let device = match self.assets.find_device(stem).await {
            Ok(Some(device)) => device,
            Ok(None) => {
                report.record_failure(FailureRecord {
                    file: file_label,
                    vendor: None,
                    best_template: None,
                    best_score: 0.0,
                    reason: format!("device not found: {}", stem),
                });
                return report;
            }
            Err(err) => {
                report.record_failure(FailureRecord {
                    file: file_label,
                    vendor: None,
                    best_template: None,
                    best_score: 0.0,
                    reason: format!("device lookup failed: {}", err),
                });
                return report;
            }
        };

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                report.record_failure(FailureRecord {
                    file: file_label,
                    vendor: device.platform.clone(),
                    best_template: None,
                    best_score: 0.0,
                    reason: format!("unreadable capture: {}", err),
                });
                return report;
            }
        };
        let captured_at = file_mtime(path);
        let vendor = device_vendor(&device);

        let parse_result = if content.trim().is_empty() {
            Err(FailureRecord {
                file: file_label.clone(),
                vendor: Some(vendor.as_str().to_string()),
                best_template: None,
                best_score: 0.0,
                reason: "empty capture file".to_string(),
            })
        } else {
            self.parse_and_store(&device, vendor, capture_type, &content, captured_at)
                .await
        };

        // The current-capture row is updated regardless of parse success so
        // operators can still browse raw output.
        let success = parse_result.is_ok();
        let current = CurrentCapture {
            device_id: device.id,
            capture_type,
            file_path: file_label.clone(),
            file_size: content.len() as i64,
            capture_timestamp: captured_at,
            content_hash: None,
            extraction_success: success,
            command_used: capture_type.command_for(vendor).map(str::to_string),
        };
        if let Err(err) = self.assets.upsert_current_capture(&current).await {
            warn!(file = %file_label, error = %err, "current-capture upsert failed");
        }

        match parse_result {
            Ok(entries) => {
                report.files_processed += 1;
                report.entries_loaded += entries;
            }
            Err(failure) => report.record_failure(failure),
        }
        report
    }

    /// Parse the content and load rows for the type's parse target.
    /// Returns the number of entries loaded.
    async fn parse_and_store(
        &self,
        device: &Device,
        vendor: Vendor,
        capture_type: CaptureType,
        content: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<usize, FailureRecord> {
        let target = capture_type.parse_target();
        if target == ParseTarget::None {
            return Ok(0);
        }

        let command = capture_type.command_for(vendor).unwrap_or(capture_type.as_str());
        let filters = filter_list(Some(vendor), command);
        let min_score = self.scoring.threshold_for(capture_type);
        let matched = self
            .templates
            .find_best(content, &filters, min_score)
            .map_err(|rejection| FailureRecord {
                file: device.normalized_name.clone(),
                vendor: Some(vendor.as_str().to_string()),
                best_template: rejection.best_template,
                best_score: rejection.best_score,
                reason: format!(
                    "no template above threshold {:.0} for {}",
                    rejection.min_score, capture_type
                ),
            })?;

        match target {
            ParseTarget::Components => self.store_components(device, &matched).await,
            ParseTarget::ArpEntries => self.store_arp(device, &matched, captured_at).await,
            ParseTarget::None => Ok(0),
        }
    }

    async fn store_components(
        &self,
        device: &Device,
        matched: &TemplateMatch,
    ) -> Result<usize, FailureRecord> {
        let components = components_from_records(device.id, matched);
        if components.is_empty() {
            return Err(FailureRecord {
                file: device.normalized_name.clone(),
                vendor: device.platform.clone(),
                best_template: Some(matched.template.clone()),
                best_score: matched.score,
                reason: "no components extracted".to_string(),
            });
        }
        self.assets
            .replace_components(device.id, &components)
            .await
            .map_err(|err| FailureRecord {
                file: device.normalized_name.clone(),
                vendor: device.platform.clone(),
                best_template: Some(matched.template.clone()),
                best_score: matched.score,
                reason: format!("component load failed: {}", err),
            })
    }

    async fn store_arp(
        &self,
        device: &Device,
        matched: &TemplateMatch,
        captured_at: DateTime<Utc>,
    ) -> Result<usize, FailureRecord> {
        let entries = entries_from_records(&matched.records);
        if entries.is_empty() {
            return Err(FailureRecord {
                file: device.normalized_name.clone(),
                vendor: device.platform.clone(),
                best_template: Some(matched.template.clone()),
                best_score: matched.score,
                reason: "no valid ARP entries extracted".to_string(),
            });
        }

        let to_failure = |err: DbError, device: &Device| FailureRecord {
            file: device.normalized_name.clone(),
            vendor: device.platform.clone(),
            best_template: Some(matched.template.clone()),
            best_score: matched.score,
            reason: format!("arp load failed: {}", err),
        };

        let arp_device = self
            .arp_cat
            .get_or_create_device(
                &device.normalized_name,
                device.vendor.as_deref(),
                device.device_type.as_deref(),
            )
            .await
            .map_err(|e| to_failure(e, device))?;

        let mut keyed = Vec::with_capacity(entries.len());
        for entry in entries {
            let context_type = if entry.context == "default" { "default" } else { "vrf" };
            let context_id = self
                .arp_cat
                .get_or_create_context(arp_device, &entry.context, context_type)
                .await
                .map_err(|e| to_failure(e, device))?;
            keyed.push((context_id, entry));
        }

        // captured_at is the file mtime, so re-loading the same capture
        // file is idempotent under the entry unique key.
        self.arp_cat
            .add_entries(arp_device, captured_at, &keyed)
            .await
            .map_err(|e| to_failure(e, device))
    }
}

fn device_vendor(device: &Device) -> Vendor {
    device
        .platform
        .as_deref()
        .and_then(|p| Vendor::from_str(p).ok())
        .filter(|v| *v != Vendor::Unknown)
        .or_else(|| {
            device
                .device_type
                .as_deref()
                .and_then(|p| Vendor::from_str(p).ok())
        })
        .or_else(|| device.vendor.as_deref().and_then(|v| Vendor::from_str(v).ok()))
        .unwrap_or(Vendor::Unknown)
}

fn file_mtime(path: &Path) -> DateTime<Utc> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use velocity_db::DeviceUpsert;
    use velocity_testkit::fixtures;

    struct Fixture {
        loader: CaptureLoader,
        assets: AssetsDb,
        arp_cat: ArpCatDb,
        layout: DataLayout,
        _dir: tempfile::TempDir,
    }

    async fn setup() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.ensure_layout().unwrap();
        let assets = AssetsDb::open_in_memory().await.unwrap();
        let arp_cat = ArpCatDb::open_in_memory().await.unwrap();
        let loader = CaptureLoader::new(
            assets.clone(),
            arp_cat.clone(),
            layout.clone(),
            ScoringConfig::default(),
        );
        Fixture {
            loader,
            assets,
            arp_cat,
            layout,
            _dir: dir,
        }
    }

    async fn add_device(assets: &AssetsDb, name: &str, platform: &str) -> i64 {
        assets
            .upsert_device(&DeviceUpsert {
                name: name.into(),
                platform: Some(platform.into()),
                vendor: Some("Cisco".into()),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    fn write_capture(layout: &DataLayout, capture_type: CaptureType, name: &str, content: &str) {
        let path = layout.capture_file(capture_type, name);
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn arp_macs_normalize_across_vendor_formats() {
        let f = setup().await;
        add_device(&f.assets, "c1", "cisco_ios").await;
        add_device(&f.assets, "h1", "hp_procurve").await;
        add_device(&f.assets, "j1", "juniper_junos").await;

        write_capture(
            &f.layout,
            CaptureType::Arp,
            "c1",
            &fixtures::cisco_arp_output(&[("10.0.0.5", "aabb.ccdd.eeff", "Vlan20")]),
        );
        write_capture(
            &f.layout,
            CaptureType::Arp,
            "h1",
            &fixtures::hp_arp_output(&[("10.0.1.5", "aabbcc-ddeeff", "24")]),
        );
        write_capture(
            &f.layout,
            CaptureType::Arp,
            "j1",
            &fixtures::juniper_arp_output(&[("10.0.2.5", "aa:bb:cc:dd:ee:ff", "ge-0/0/0.0")]),
        );

        let report = f
            .loader
            .load_capture_types(&[CaptureType::Arp])
            .await
            .unwrap();
        assert_eq!(report.files_processed, 3, "failures: {:?}", report.reasons);
        assert_eq!(report.entries_loaded, 3);

        let sightings = f.arp_cat.search_mac("aa:bb:cc:dd:ee:ff").await.unwrap();
        assert_eq!(sightings.len(), 3);
        for s in &sightings {
            assert_eq!(s.mac_address, "aa:bb:cc:dd:ee:ff");
        }
    }

    #[tokio::test]
    async fn inventory_capture_loads_components() {
        let f = setup().await;
        let device_id = add_device(&f.assets, "sw1", "cisco_ios").await;
        write_capture(
            &f.layout,
            CaptureType::Inventory,
            "sw1",
            &fixtures::cisco_inventory(&[
                ("1", "WS-C3850-48T", "WS-C3850-48T", "FCW1111A1AA"),
                ("Switch 1 - Power Supply A", "Switch 1 - Power Supply A", "PWR-C1-715WAC", "DTN1111X1XX"),
            ]),
        );

        let report = f
            .loader
            .load_capture_types(&[CaptureType::Inventory])
            .await
            .unwrap();
        assert_eq!(report.files_processed, 1, "failures: {:?}", report.reasons);
        assert_eq!(report.entries_loaded, 2);

        let components = f.assets.components_for(device_id).await.unwrap();
        assert_eq!(components.len(), 2);
        let psu = components
            .iter()
            .find(|c| c.component_type == "psu")
            .expect("psu classified");
        assert_eq!(psu.serial.as_deref(), Some("DTN1111X1XX"));
        assert!(psu.have_sn);
        assert_eq!(
            components[0].extraction_source.as_deref(),
            Some("cisco_ios_show_inventory")
        );
    }

    #[tokio::test]
    async fn loading_twice_is_idempotent() {
        let f = setup().await;
        let device_id = add_device(&f.assets, "sw1", "cisco_ios").await;
        write_capture(
            &f.layout,
            CaptureType::Inventory,
            "sw1",
            &fixtures::cisco_inventory(&[("1", "WS-C3850-48T", "WS-C3850-48T", "FCW1111A1AA")]),
        );
        write_capture(
            &f.layout,
            CaptureType::Arp,
            "sw1",
            &fixtures::cisco_arp_output(&[("10.0.0.5", "aabb.ccdd.eeff", "Vlan20")]),
        );

        let types = [CaptureType::Inventory, CaptureType::Arp];
        f.loader.load_capture_types(&types).await.unwrap();
        let components_before = f.assets.components_for(device_id).await.unwrap().len();
        let arp_before = f.arp_cat.entry_count().await.unwrap();

        f.loader.load_capture_types(&types).await.unwrap();
        assert_eq!(
            f.assets.components_for(device_id).await.unwrap().len(),
            components_before
        );
        assert_eq!(f.arp_cat.entry_count().await.unwrap(), arp_before);
    }

    #[tokio::test]
    async fn empty_capture_fails_but_current_row_is_upserted() {
        let f = setup().await;
        let device_id = add_device(&f.assets, "sw1", "cisco_ios").await;
        write_capture(&f.layout, CaptureType::Arp, "sw1", "");

        let report = f
            .loader
            .load_capture_types(&[CaptureType::Arp])
            .await
            .unwrap();
        assert_eq!(report.files_failed, 1);
        assert!(report.reasons[0].reason.contains("empty"));

        let current = f
            .assets
            .current_capture(device_id, CaptureType::Arp)
            .await
            .unwrap()
            .expect("current row exists");
        assert!(!current.extraction_success);
    }

    #[tokio::test]
    async fn unknown_device_is_a_per_file_failure() {
        let f = setup().await;
        add_device(&f.assets, "known", "cisco_ios").await;
        write_capture(
            &f.layout,
            CaptureType::Arp,
            "ghost",
            &fixtures::cisco_arp_output(&[("10.0.0.5", "aabb.ccdd.eeff", "Vlan20")]),
        );
        write_capture(
            &f.layout,
            CaptureType::Arp,
            "known",
            &fixtures::cisco_arp_output(&[("10.0.0.6", "0011.2233.4455", "Vlan20")]),
        );

        let report = f
            .loader
            .load_capture_types(&[CaptureType::Arp])
            .await
            .unwrap();
        // The bad file never aborts the batch.
        assert_eq!(report.files_failed, 1);
        assert_eq!(report.files_processed, 1);
        assert!(report.reasons[0].reason.contains("device not found"));
    }

    #[tokio::test]
    async fn raw_only_types_update_current_without_extraction() {
        let f = setup().await;
        let device_id = add_device(&f.assets, "sw1", "cisco_ios").await;
        write_capture(
            &f.layout,
            CaptureType::Configs,
            "sw1",
            &fixtures::running_config("sw1", &[]),
        );

        let report = f
            .loader
            .load_capture_types(&[CaptureType::Configs])
            .await
            .unwrap();
        assert_eq!(report.files_processed, 1);
        assert_eq!(report.entries_loaded, 0);
        let current = f
            .assets
            .current_capture(device_id, CaptureType::Configs)
            .await
            .unwrap()
            .unwrap();
        assert!(current.extraction_success);
        assert_eq!(current.command_used.as_deref(), Some("show running-config"));
    }
}
