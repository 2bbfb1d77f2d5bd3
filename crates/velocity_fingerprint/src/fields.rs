//! Vendor-agnostic field resolution.
//!
//! Templates disagree on field names; these priority lists map whatever a
//! template extracted onto the normalized device record. Order matters and
//! the exclusions are deliberate: HW_VERSION/ROM_VERSION are hardware
//! revisions, not software versions, and HARDWARE_ADDR is a MAC, never a
//! serial.

use velocity_templates::{FieldValue, Record};

/// Normalized fields resolved from one or more parsed records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub hostname: Option<String>,
    pub software_version: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    /// (model, serial) pairs for stacked chassis, aligned by position.
    pub stack_members: Vec<(String, String)>,
}

impl ExtractedFields {
    /// The tracked set is complete; the command queue can stop.
    pub fn is_complete(&self) -> bool {
        self.software_version.is_some() && self.model.is_some() && self.serial.is_some()
    }

    /// Any tracked field counts as a successful fingerprint.
    pub fn any_extracted(&self) -> bool {
        self.hostname.is_some()
            || self.software_version.is_some()
            || self.model.is_some()
            || self.serial.is_some()
    }

    /// Merge fields from a later parse; earlier assignments win.
    pub fn merge(&mut self, other: ExtractedFields) {
        if self.hostname.is_none() {
            self.hostname = other.hostname;
        }
        if self.software_version.is_none() {
            self.software_version = other.software_version;
        }
        if self.model.is_none() {
            self.model = other.model;
        }
        if self.serial.is_none() {
            self.serial = other.serial;
        }
        if self.stack_members.is_empty() {
            self.stack_members = other.stack_members;
        }
    }
}

const VERSION_EXCLUDED: &[&str] = &["HW_VERSION", "ROM_VERSION", "ROMMON_VERSION"];

/// Resolve normalized fields from parsed records.
pub fn resolve_fields(records: &[Record]) -> ExtractedFields {
    let mut out = ExtractedFields::default();

    for record in records {
        if out.hostname.is_none() {
            out.hostname = field_value(record, |name| name.contains("HOSTNAME"));
        }

        if out.software_version.is_none() {
            out.software_version = field_value(record, |name| name == "SOFTWARE_VERSION")
                .or_else(|| field_value(record, |name| name == "VERSION"))
                .or_else(|| {
                    record
                        .iter()
                        .find(|(name, value)| {
                            let name = name.as_str();
                            name.contains("VERSION")
                                && !VERSION_EXCLUDED.contains(&name)
                                && looks_like_version(value.first())
                        })
                        .map(|(_, value)| value.first().trim().to_string())
                });
        }

        let hardware = record.get("HARDWARE");
        if out.model.is_none() {
            out.model = field_value(record, |name| name == "MODEL")
                .or_else(|| hardware.map(|v| v.first().trim().to_string()).filter(|s| !s.is_empty()))
                .or_else(|| field_value(record, |name| name == "PID"));
        }

        let serial_list = record
            .get("SERIAL_NUMBER")
            .or_else(|| record.get("SERIAL"))
            .or_else(|| record.get("SN"));
        if out.serial.is_none() {
            out.serial = serial_list
                .map(|v| v.first().trim().to_string())
                .filter(|s| !s.is_empty());
        }

        // Stacked Cisco IOS reports HARDWARE and SERIAL as aligned lists.
        if out.stack_members.is_empty() {
            if let (Some(models), Some(serials)) = (hardware, serial_list) {
                let models = models.all();
                let serials = serials.all();
                if models.len() == serials.len() && models.len() > 1 {
                    out.stack_members = models
                        .iter()
                        .zip(serials.iter())
                        .map(|(m, s)| (m.to_string(), s.to_string()))
                        .collect();
                }
            }
        }
    }

    out
}

fn field_value(record: &Record, matches: impl Fn(&str) -> bool) -> Option<String> {
    record
        .iter()
        .find(|(name, value)| matches(name.as_str()) && !value.is_empty())
        .map(|(_, value)| value.first().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Version strings carry digits and dots and are short; serials, MACs and
/// image filenames are not versions.
fn looks_like_version(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.len() > 50 {
        return false;
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    if value.ends_with(".bin") || value.contains(':') {
        return false;
    }
    // Long all-caps alphanumeric runs are serial numbers.
    let caps_run = value
        .chars()
        .take_while(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .count();
    if caps_run == value.len() && value.len() >= 9 && !value.contains('.') {
        return false;
    }
    value.contains('.') || value.starts_with('v') || value.starts_with('V')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::Single(v.to_string())))
            .collect::<BTreeMap<_, _>>()
    }

    #[test]
    fn software_version_priority_order() {
        let r = record(&[
            ("VERSION", "15.2(7)E3"),
            ("SOFTWARE_VERSION", "4.28.3M"),
            ("HW_VERSION", "11.03"),
        ]);
        let fields = resolve_fields(&[r]);
        assert_eq!(fields.software_version.as_deref(), Some("4.28.3M"));
    }

    #[test]
    fn hw_and_rom_versions_never_win() {
        let r = record(&[("HW_VERSION", "11.03"), ("ROM_VERSION", "16.1.2")]);
        let fields = resolve_fields(&[r]);
        assert_eq!(fields.software_version, None);

        let r = record(&[("OS_VERSION", "7.0(3)I7(9)"), ("ROM_VERSION", "16.1.2")]);
        let fields = resolve_fields(&[r]);
        assert_eq!(fields.software_version.as_deref(), Some("7.0(3)I7(9)"));
    }

    #[test]
    fn model_falls_back_through_hardware_to_pid() {
        let fields = resolve_fields(&[record(&[("PID", "WS-C3850-48T")])]);
        assert_eq!(fields.model.as_deref(), Some("WS-C3850-48T"));

        let fields = resolve_fields(&[record(&[
            ("PID", "GLC-TE"),
            ("HARDWARE", "WS-C2960X-48TS-L"),
        ])]);
        assert_eq!(fields.model.as_deref(), Some("WS-C2960X-48TS-L"));

        let fields = resolve_fields(&[record(&[
            ("MODEL", "DCS-7050SX3"),
            ("HARDWARE", "ignored"),
        ])]);
        assert_eq!(fields.model.as_deref(), Some("DCS-7050SX3"));
    }

    #[test]
    fn hardware_addr_is_not_a_serial() {
        let fields = resolve_fields(&[record(&[("HARDWARE_ADDR", "aabbcc-ddeeff")])]);
        assert_eq!(fields.serial, None);

        let fields = resolve_fields(&[record(&[
            ("HARDWARE_ADDR", "aabbcc-ddeeff"),
            ("SERIAL_NUMBER", "SG99XK0042"),
        ])]);
        assert_eq!(fields.serial.as_deref(), Some("SG99XK0042"));
    }

    #[test]
    fn stacked_hardware_aligns_with_serials() {
        let mut r: Record = BTreeMap::new();
        r.insert(
            "HARDWARE".into(),
            FieldValue::Multi(vec!["WS-C3850-48T".into(), "WS-C3850-48T".into()]),
        );
        r.insert(
            "SERIAL".into(),
            FieldValue::Multi(vec!["FCW1111A1AA".into(), "FCW2222B2BB".into()]),
        );
        r.insert("VERSION".into(), FieldValue::Single("16.12.04".into()));

        let fields = resolve_fields(&[r]);
        assert_eq!(fields.model.as_deref(), Some("WS-C3850-48T"));
        assert_eq!(fields.serial.as_deref(), Some("FCW1111A1AA"));
        assert_eq!(
            fields.stack_members,
            vec![
                ("WS-C3850-48T".to_string(), "FCW1111A1AA".to_string()),
                ("WS-C3850-48T".to_string(), "FCW2222B2BB".to_string()),
            ]
        );
    }

    #[test]
    fn partial_extraction_still_counts() {
        let fields = resolve_fields(&[record(&[("VERSION", "16.12.04")])]);
        assert!(fields.any_extracted());
        assert!(!fields.is_complete());
    }

    #[test]
    fn version_content_validation() {
        assert!(looks_like_version("16.12.04"));
        assert!(looks_like_version("15.1(4)M4"));
        assert!(looks_like_version("v17"));
        assert!(!looks_like_version("FXS2516Q2GW"));
        assert!(!looks_like_version("cat3k_caa-universalk9.bin"));
        assert!(!looks_like_version("aa:bb:cc:dd:ee:ff"));
        assert!(!looks_like_version("forty-two"));
    }
}
