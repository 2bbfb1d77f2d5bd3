//! Change-detection archive.
//!
//! For each newly captured file of a tracked type: hash the content,
//! compare against the most recent snapshot, and either record a baseline,
//! deduplicate, or persist a new snapshot plus a unified diff and a change
//! record. Snapshots and change records are append-only and never mutated;
//! re-running over unchanged content is a no-op.

pub mod archive;
pub mod diff;

pub use archive::{ArchiveError, ArchiveOutcome, CaptureArchive};
pub use diff::{count_changed_lines, normalize_for_diff, unified_diff};
