//! Parse-and-load layer: raw capture files into normalized rows.
//!
//! The loader walks `capture/<type>/`, resolves each file to a device,
//! selects a template through the vendor filter list, and loads parsed
//! records into the target tables - components (replace-by-device), ARP
//! entries (append-only). The "current capture" row is upserted whether or
//! not parsing succeeded, so operators can always browse raw output. One
//! bad file never aborts a batch.

pub mod arp;
pub mod components;
pub mod loader;
pub mod report;

pub use loader::{CaptureLoader, LoaderError};
pub use report::{FailureRecord, LoadReport};
