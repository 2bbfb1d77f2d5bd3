//! Batch load reporting.

use serde::Serialize;

/// One file the loader could not parse or attribute.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub file: String,
    pub vendor: Option<String>,
    pub best_template: Option<String>,
    pub best_score: f64,
    pub reason: String,
}

/// Returned to the operator after a batch load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub files_processed: usize,
    pub entries_loaded: usize,
    pub files_failed: usize,
    pub reasons: Vec<FailureRecord>,
}

impl LoadReport {
    pub fn merge(&mut self, other: LoadReport) {
        self.files_processed += other.files_processed;
        self.entries_loaded += other.entries_loaded;
        self.files_failed += other.files_failed;
        self.reasons.extend(other.reasons);
    }

    pub fn record_failure(&mut self, failure: FailureRecord) {
        self.files_failed += 1;
        self.reasons.push(failure);
    }
}
