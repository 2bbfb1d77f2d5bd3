//! Typed rows for the stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use velocity_protocol::{CaptureType, Severity};

/// A device row from assets.db.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub normalized_name: String,
    pub management_ip: Option<String>,
    pub ipv4_address: Option<String>,
    pub vendor: Option<String>,
    pub site: Option<String>,
    pub device_type: Option<String>,
    pub platform: Option<String>,
    pub model: Option<String>,
    pub software_version: Option<String>,
    pub serial: Option<String>,
    pub source_system: Option<String>,
    pub fingerprinted_at: Option<DateTime<Utc>>,
}

/// Fields merged into a device row on upsert. Empty options leave the
/// stored value alone; a device is never degraded by a partial source.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpsert {
    pub name: String,
    pub management_ip: Option<String>,
    pub ipv4_address: Option<String>,
    pub vendor: Option<String>,
    pub site: Option<String>,
    pub device_type: Option<String>,
    pub platform: Option<String>,
    pub model: Option<String>,
    pub software_version: Option<String>,
    pub serial: Option<String>,
    pub source_system: Option<String>,
    pub fingerprinted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub device_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub serial: Option<String>,
    pub position: Option<String>,
    pub have_sn: bool,
    pub component_type: String,
    pub subtype: Option<String>,
    pub extraction_source: Option<String>,
    pub extraction_confidence: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CurrentCapture {
    pub device_id: i64,
    pub capture_type: CaptureType,
    pub file_path: String,
    pub file_size: i64,
    pub capture_timestamp: DateTime<Utc>,
    pub content_hash: Option<String>,
    pub extraction_success: bool,
    pub command_used: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CaptureSnapshot {
    pub id: i64,
    pub device_id: i64,
    pub capture_type: CaptureType,
    pub captured_at: DateTime<Utc>,
    pub file_path: String,
    pub content: String,
    pub content_hash: String,
}

#[derive(Debug, Clone)]
pub struct CaptureChange {
    pub id: i64,
    pub device_id: i64,
    pub capture_type: CaptureType,
    pub detected_at: DateTime<Utc>,
    pub previous_snapshot_id: Option<i64>,
    pub current_snapshot_id: i64,
    pub lines_added: i64,
    pub lines_removed: i64,
    pub diff_path: Option<String>,
    pub severity: Severity,
}

/// One ARP sighting ready for insert. MAC already canonical.
#[derive(Debug, Clone, PartialEq)]
pub struct ArpEntryRecord {
    pub ip_address: String,
    pub mac_address: String,
    pub mac_address_raw: Option<String>,
    pub interface: Option<String>,
    pub entry_type: Option<String>,
    pub context: String,
}

/// A named recurring collection job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedJob {
    pub id: i64,
    pub name: String,
    pub capture_types: Vec<CaptureType>,
    pub device_selection: String,
    pub schedule: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_status: Option<String>,
}

/// A full-text hit over snapshot history.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub device_name: String,
    pub capture_type: String,
    pub captured_at: DateTime<Utc>,
    pub snippet: String,
}
