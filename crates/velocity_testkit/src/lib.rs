//! Test doubles for the network seam.
//!
//! `MockConnector` implements `DeviceConnector` over a table of scripted
//! devices: canned command output, simulated per-command latency, scripted
//! connect failures, and instrumentation (connect attempts, concurrent
//! session high-water mark) for the concurrency-bound and retry tests.

pub mod fixtures;
pub mod mock;

pub use mock::{MockConnector, MockDevice};
