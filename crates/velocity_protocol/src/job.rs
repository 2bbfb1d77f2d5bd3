//! Job identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier for a discovery/fingerprint/collection run.
///
/// `job-` plus the first eight hex characters of a v4 UUID - short enough
/// for log lines, unique enough for the in-process registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        JobId(format!("job-{}", &uuid[..8]))
    }

    /// Wrap an existing id string (tests, resumed runs).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        JobId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_have_prefix_and_are_unique() {
        let a = JobId::generate();
        let b = JobId::generate();
        assert!(a.as_str().starts_with("job-"));
        assert_eq!(a.as_str().len(), "job-".len() + 8);
        assert_ne!(a, b);
    }
}
