//! Hardware-inventory extraction: template records into component rows.

use velocity_db::Component;
use velocity_templates::{FieldValue, Record, TemplateMatch};

/// Classify a component from its name and description keywords.
fn classify(name: &str, description: &str) -> &'static str {
    let text = format!("{} {}", name, description).to_lowercase();
    if text.contains("supervisor") || text.contains("sup-") {
        "supervisor"
    } else if text.contains("power supply") || text.contains("psu") || text.contains("pwr") {
        "psu"
    } else if text.contains("fan") {
        "fan"
    } else if text.contains("transceiver")
        || text.contains("sfp")
        || text.contains("qsfp")
        || text.contains("glc-")
    {
        "transceiver"
    } else if text.contains("chassis") || text.contains("stack") {
        "chassis"
    } else if text.contains("module") || text.contains("linecard") || text.contains("mpc") {
        "module"
    } else {
        "unknown"
    }
}

/// Position hint from the component name ("Switch 1 - Power Supply A",
/// "FPC 0", "1"). Falls back to the record index so the (device, name,
/// position) key stays unique for repeated names.
fn position_of(name: &str, index: usize) -> String {
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        index.to_string()
    } else {
        digits
    }
}

/// Map parsed inventory records onto component rows.
pub fn components_from_records(
    device_id: i64,
    matched: &TemplateMatch,
) -> Vec<Component> {
    let confidence = (matched.score / 100.0).clamp(0.0, 1.0);
    matched
        .records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| component_from_record(device_id, record, index, matched, confidence))
        .collect()
}

fn component_from_record(
    device_id: i64,
    record: &Record,
    index: usize,
    matched: &TemplateMatch,
    confidence: f64,
) -> Option<Component> {
    let get = |key: &str| {
        record
            .get(key)
            .map(FieldValue::first)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    // Cisco-style NAME/DESCR or Juniper ITEM/DESCRIPTION.
    let name = get("NAME").or_else(|| get("ITEM"))?;
    let description = get("DESCR")
        .or_else(|| get("DESCRIPTION"))
        .or_else(|| get("PID"));
    let serial = get("SERIAL_NUMBER").or_else(|| get("SERIAL")).or_else(|| get("SN"));
    let have_sn = serial.is_some();
    let descr_text = description.clone().unwrap_or_default();

    Some(Component {
        device_id,
        name: name.clone(),
        component_type: classify(&name, &descr_text).to_string(),
        subtype: get("PID"),
        description,
        serial,
        position: Some(position_of(&name, index)),
        have_sn,
        extraction_source: Some(matched.template.clone()),
        extraction_confidence: Some(confidence),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_keywords() {
        assert_eq!(classify("1", "WS-C3850-48T"), "unknown");
        assert_eq!(classify("Switch 1 - Power Supply A", ""), "psu");
        assert_eq!(classify("Switch 1 - FAN 1", ""), "fan");
        assert_eq!(classify("GigabitEthernet1/1/1", "1000BaseSX SFP Transceiver"), "transceiver");
        assert_eq!(classify("Chassis", "MX240"), "chassis");
        assert_eq!(classify("FPC 0", "MPC Type 2"), "module");
        assert_eq!(classify("Supervisor Module", ""), "supervisor");
    }

    #[test]
    fn positions_prefer_embedded_digits() {
        assert_eq!(position_of("Switch 2 - Power Supply A", 7), "2");
        assert_eq!(position_of("FPC 0", 3), "0");
        assert_eq!(position_of("Chassis", 4), "4");
    }
}
