//! Shared protocol types for the VelocityCMDB core.
//!
//! Canonical enums, the capture-type catalog, the progress event union,
//! data-directory layout, and the name/address normalizers. Every other
//! crate speaks these types; nothing here touches the network or the
//! database.

pub mod config;
pub mod event;
pub mod inventory;
pub mod job;
pub mod naming;
pub mod paths;
pub mod types;

pub use config::{CollectionConfig, CoreConfig, ScoringConfig, SeverityThresholds, SshConfig};
pub use event::{ChannelSink, EventSink, JsonLineSink, NullSink, ProgressEvent};
pub use inventory::{InventoryFolder, InventorySession, SessionsFile};
pub use job::JobId;
pub use naming::{normalize_mac, normalize_name, parse_ip, NamingError};
pub use types::{CaptureType, ParseTarget, Severity, Vendor};
