//! Diff generation and noise filtering.

use regex::Regex;
use similar::TextDiff;
use std::sync::OnceLock;

use velocity_protocol::CaptureType;

/// Context lines in generated diffs.
const DIFF_CONTEXT: usize = 3;

fn noise_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^Last login:.*$",
            r"^! Last configuration change at.*$",
            r"^Building configuration.*$",
            r"^Current configuration : \d+ bytes$",
            r"^! NVRAM config last updated.*$",
            r"^\s*!\s*Time:.*$",
            r"^.*ntp clock-period.*$",
            r"^.*Your previous successful login.*$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static noise pattern"))
        .collect()
    })
}

/// Drop timestamp/banner churn before diffing tracked captures so that a
/// login banner alone never registers as a configuration change.
pub fn normalize_for_diff(content: &str, capture_type: CaptureType) -> String {
    if !capture_type.is_tracked() {
        return content.to_string();
    }
    let patterns = noise_patterns();
    content
        .lines()
        .filter(|line| !patterns.iter().any(|p| p.is_match(line.trim_end())))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Unified diff between two normalized texts, 3 lines of context.
pub fn unified_diff(previous: &str, current: &str) -> String {
    TextDiff::from_lines(previous, current)
        .unified_diff()
        .context_radius(DIFF_CONTEXT)
        .header("previous", "current")
        .to_string()
}

/// Count added/removed lines in a unified diff, skipping the file headers.
pub fn count_changed_lines(diff: &str) -> (i64, i64) {
    let mut added = 0;
    let mut removed = 0;
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            continue;
        }
        if line.starts_with('+') {
            added += 1;
        } else if line.starts_with('-') {
            removed += 1;
        }
    }
    (added, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_counts_added_and_removed() {
        let old = "a\nb\nc\n";
        let new = "a\nB\nc\nd\n";
        let diff = unified_diff(old, new);
        let (added, removed) = count_changed_lines(&diff);
        assert_eq!(added, 2);
        assert_eq!(removed, 1);
        assert!(diff.contains("--- previous"));
        assert!(diff.contains("+++ current"));
    }

    #[test]
    fn identical_inputs_produce_empty_diff() {
        let diff = unified_diff("same\n", "same\n");
        assert!(diff.trim().is_empty());
    }

    #[test]
    fn noise_lines_are_filtered_for_tracked_types() {
        let content = "Building configuration...\nhostname sw1\n! Last configuration change at 12:00\ninterface Vlan1\n";
        let normalized = normalize_for_diff(content, CaptureType::Configs);
        assert_eq!(normalized, "hostname sw1\ninterface Vlan1");

        // Untracked types pass through untouched.
        let untouched = normalize_for_diff(content, CaptureType::Arp);
        assert_eq!(untouched, content);
    }
}
