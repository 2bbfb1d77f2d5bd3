//! Template index: filter-list construction, candidate selection, scoring.

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use velocity_protocol::Vendor;

use crate::builtin;
use crate::engine::{Record, Template, TemplateError};

/// Result of a successful template selection.
#[derive(Debug, Clone)]
pub struct TemplateMatch {
    pub template: String,
    pub records: Vec<Record>,
    pub score: f64,
}

/// Best candidate seen when nothing cleared the minimum score. Kept for
/// operator inspection and template-library improvement.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseRejection {
    pub best_template: Option<String>,
    pub best_score: f64,
    pub min_score: f64,
}

/// Build the ordered filter list for a (vendor, command) pair, most
/// specific first:
///
/// ```text
/// hp_procurve_show_system_info   vendor + full command
/// hp_procurve_show_system        vendor + base command
/// show_system_info               full command
/// show_system                    base command
/// show                           first word
/// ```
pub fn filter_list(vendor: Option<Vendor>, command: &str) -> Vec<String> {
    let cmd = command.trim().to_lowercase().replace([' ', '-'], "_");
    let words: Vec<&str> = cmd.split('_').filter(|w| !w.is_empty()).collect();
    let base = if words.len() >= 2 {
        Some(words[..2].join("_"))
    } else {
        None
    };

    let mut filters = Vec::new();
    let mut push = |f: String| {
        if !filters.contains(&f) {
            filters.push(f);
        }
    };

    if let Some(v) = vendor.filter(|v| *v != Vendor::Unknown) {
        push(format!("{}_{}", v.template_prefix(), cmd));
        if let Some(base) = &base {
            push(format!("{}_{}", v.template_prefix(), base));
        }
    }
    push(cmd.clone());
    if let Some(base) = &base {
        push(base.clone());
    }
    if let Some(first) = words.first() {
        push((*first).to_string());
    }
    filters
}

/// The template database: named templates searched by filter string.
pub struct TemplateIndex {
    templates: Vec<Arc<Template>>,
}

impl TemplateIndex {
    /// Index over the builtin library.
    pub fn builtin() -> Self {
        let templates = builtin::all()
            .into_iter()
            .map(|(name, source)| {
                // Builtin sources are compile-time constants; a parse failure
                // here is a programming error caught by the library tests.
                Arc::new(Template::parse(name, source).expect("builtin template parses"))
            })
            .collect();
        Self { templates }
    }

    pub fn empty() -> Self {
        Self {
            templates: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Add a single template from source text.
    pub fn add(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.templates
            .push(Arc::new(Template::parse(name, source)?));
        Ok(())
    }

    /// Load `.textfsm` files from a directory, template name = file stem.
    /// Files that fail to compile are skipped with a logged reason.
    pub fn load_dir(&mut self, dir: &Path) -> std::io::Result<usize> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("textfsm") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path)?;
            match Template::parse(name, &source) {
                Ok(t) => {
                    self.templates.push(Arc::new(t));
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(template = name, error = %e, "skipping unparseable template");
                }
            }
        }
        Ok(loaded)
    }

    /// Candidates whose name contains every filter term longer than two
    /// characters (hyphens fold to underscores, as in the filter list).
    pub fn filtered(&self, filter: &str) -> Vec<&Template> {
        let terms: Vec<String> = filter
            .replace('-', "_")
            .split('_')
            .filter(|t| t.len() > 2)
            .map(|t| t.to_lowercase())
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }
        self.templates
            .iter()
            .filter(|t| {
                let name = t.name().to_lowercase();
                terms.iter().all(|term| name.contains(term.as_str()))
            })
            .map(Arc::as_ref)
            .collect()
    }

    /// Score every candidate from the filter list against the output and
    /// return the best match above `min_score`, or a rejection describing
    /// the best candidate seen.
    pub fn find_best(
        &self,
        output: &str,
        filters: &[String],
        min_score: f64,
    ) -> Result<TemplateMatch, ParseRejection> {
        let mut best: Option<TemplateMatch> = None;

        for (level, filter) in filters.iter().enumerate() {
            let bonus = specificity_bonus(level);
            for template in self.filtered(filter) {
                let records = template.parse_text(output);
                if records.is_empty() {
                    continue;
                }
                let score = score_parse(template, &records) + bonus;
                debug!(
                    template = template.name(),
                    filter, score, records = records.len(),
                    "template candidate"
                );
                if best.as_ref().map(|b| score > b.score).unwrap_or(true) {
                    best = Some(TemplateMatch {
                        template: template.name().to_string(),
                        records,
                        score,
                    });
                }
            }
        }

        match best {
            Some(m) if m.score >= min_score => Ok(m),
            other => Err(ParseRejection {
                best_template: other.as_ref().map(|m| m.template.clone()),
                best_score: other.map(|m| m.score).unwrap_or(0.0),
                min_score,
            }),
        }
    }
}

/// Bonus by filter level: exact vendor+command matches outrank generic
/// fallbacks even when both parse the same rows.
fn specificity_bonus(level: usize) -> f64 {
    match level {
        0 => 12.0,
        1 => 8.0,
        2 => 5.0,
        3 => 3.0,
        _ => 0.0,
    }
}

/// Goodness of fit: how many rows parsed and how completely the template's
/// declared values were populated.
///
/// Version-style output is a single logical record; a version template that
/// produces exactly one row is rewarded, a fragmented parse is penalized.
fn score_parse(template: &Template, records: &[Record]) -> f64 {
    let mut score = 0.0;

    if template.name().contains("version") {
        score += if records.len() == 1 { 30.0 } else { 15.0 };
    } else {
        score += (records.len() as f64 * 10.0).min(30.0);
    }

    let declared = template.value_names().len();
    if declared > 0 {
        let populated: usize = records
            .iter()
            .map(|r| r.values().filter(|v| !v.is_empty()).count())
            .max()
            .unwrap_or(0);
        score += (populated as f64 / declared as f64) * 40.0;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_list_shape_matches_contract() {
        let filters = filter_list(Some(Vendor::HpProcurve), "show system info");
        assert_eq!(
            filters,
            vec![
                "hp_procurve_show_system_info",
                "hp_procurve_show_system",
                "show_system_info",
                "show_system",
                "show",
            ]
        );
    }

    #[test]
    fn filter_list_without_vendor() {
        let filters = filter_list(None, "show version");
        assert_eq!(filters, vec!["show_version", "show"]);
        let filters = filter_list(Some(Vendor::Unknown), "show version");
        assert_eq!(filters, vec!["show_version", "show"]);
    }

    #[test]
    fn short_terms_do_not_match_everything() {
        let mut index = TemplateIndex::empty();
        index
            .add("cisco_ios_show_ip_arp", "Value A (\\S+)\n\nStart\n  ^x ${A}\n")
            .unwrap();
        // "ip" is only two characters; the filter still selects via the
        // longer terms.
        let hits = index.filtered("cisco_ios_show_ip_arp");
        assert_eq!(hits.len(), 1);
        assert!(index.filtered("xy").is_empty());
    }

    #[test]
    fn rejection_reports_best_candidate() {
        let index = TemplateIndex::builtin();
        let filters = filter_list(Some(Vendor::CiscoIos), "show version");
        let err = index
            .find_best("complete garbage with no structure", &filters, 20.0)
            .unwrap_err();
        assert_eq!(err.min_score, 20.0);
        assert!(err.best_score < 20.0);
    }

    #[test]
    fn builtin_library_compiles() {
        let index = TemplateIndex::builtin();
        assert!(index.len() >= 15, "expected the full builtin library");
    }

    #[test]
    fn load_dir_picks_up_textfsm_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("acme_show_widgets.textfsm"),
            "Value W (\\S+)\n\nStart\n  ^widget ${W} -> Record\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let mut index = TemplateIndex::empty();
        let loaded = index.load_dir(dir.path()).unwrap();
        assert_eq!(loaded, 1);
        assert_eq!(index.filtered("acme_show_widgets").len(), 1);
    }
}
