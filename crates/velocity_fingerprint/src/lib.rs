//! Fingerprint engine: parallel SSH probe + template-scored platform
//! identification.
//!
//! For each inventory entry without a confirmed platform the engine runs a
//! per-device command queue (seeded with `show version`), detects the
//! vendor from output signatures, follows up with platform-specific
//! commands when the first probe is insufficient, and resolves the tracked
//! fields {software version, model, serial} through the vendor-agnostic
//! priority lists.

pub mod engine;
pub mod fields;

pub use engine::{
    FingerprintEngine, FingerprintOptions, FingerprintOutcome, FingerprintSummary,
};
pub use fields::{resolve_fields, ExtractedFields};
