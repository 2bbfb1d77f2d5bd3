//! Collection orchestrator.
//!
//! Turns a device selection and a set of capture types into a
//! bounded-concurrency fan-out of SSH work, emits live per-device progress
//! on the shared event protocol, persists raw outputs under
//! `capture/<type>/<hostname>.txt`, and - when asked - hands the results to
//! the parse-and-load layer and the change archive.

pub mod jobs;
pub mod orchestrator;

pub use jobs::{build_jobs, BatchDevice, CollectionJob, DeviceTarget};
pub use orchestrator::{
    CollectionOptions, CollectionResult, Collector, CollectorError, SucceededCapture,
};
