//! ARP extraction: template records into normalized ARP entries.

use std::collections::HashSet;
use tracing::warn;

use velocity_db::ArpEntryRecord;
use velocity_protocol::{normalize_mac, parse_ip};
use velocity_templates::{FieldValue, Record};

/// Map parsed ARP records to normalized entries.
///
/// Field priorities: MAC_ADDRESS then HARDWARE_ADDR; IP_ADDRESS then
/// ADDRESS; INTERFACE then PORT. Entries with malformed MACs or invalid
/// IPs are dropped with a logged warning. Duplicates within one capture
/// collapse on (context, ip, mac).
pub fn entries_from_records(records: &[Record]) -> Vec<ArpEntryRecord> {
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut out = Vec::new();

    for record in records {
        let get = |keys: &[&str]| {
            keys.iter().find_map(|key| {
                record
                    .get(*key)
                    .map(FieldValue::first)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        };

        let Some(raw_mac) = get(&["MAC_ADDRESS", "HARDWARE_ADDR"]) else {
            continue;
        };
        let Some(raw_ip) = get(&["IP_ADDRESS", "ADDRESS"]) else {
            continue;
        };

        let mac = match normalize_mac(&raw_mac) {
            Ok(mac) => mac,
            Err(err) => {
                warn!(mac = %raw_mac, error = %err, "rejecting malformed MAC");
                continue;
            }
        };
        let ip = match parse_ip(&raw_ip) {
            Ok(ip) => ip,
            Err(err) => {
                warn!(ip = %raw_ip, error = %err, "rejecting invalid IP");
                continue;
            }
        };

        let context = get(&["CONTEXT", "VRF"]).unwrap_or_else(|| "default".to_string());
        if !seen.insert((context.clone(), ip.clone(), mac.clone())) {
            continue;
        }

        out.push(ArpEntryRecord {
            ip_address: ip,
            mac_address: mac,
            mac_address_raw: Some(raw_mac),
            interface: get(&["INTERFACE", "PORT"]),
            entry_type: get(&["TYPE", "ENTRY_TYPE"]),
            context,
        });
    }

    out
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
    fn vendor_mac_formats_normalize() {
        let records = vec![
            record(&[("ADDRESS", "10.0.0.1"), ("MAC_ADDRESS", "aabb.ccdd.eeff")]),
            record(&[("IP_ADDRESS", "10.0.0.2"), ("MAC_ADDRESS", "aa:bb:cc:dd:ee:ff")]),
            record(&[("IP_ADDRESS", "10.0.0.3"), ("MAC_ADDRESS", "aabbcc-ddeeff")]),
        ];
        let entries = entries_from_records(&records);
        assert_eq!(entries.len(), 3);
        for entry in &entries {
            assert_eq!(entry.mac_address, "aa:bb:cc:dd:ee:ff");
        }
        assert_eq!(entries[0].mac_address_raw.as_deref(), Some("aabb.ccdd.eeff"));
    }

    #[test]
    fn interface_falls_back_to_port() {
        let records = vec![record(&[
            ("IP_ADDRESS", "10.0.0.9"),
            ("MAC_ADDRESS", "aabbcc-ddeeff"),
            ("PORT", "24"),
        ])];
        let entries = entries_from_records(&records);
        assert_eq!(entries[0].interface.as_deref(), Some("24"));
    }

    #[test]
    fn malformed_rows_are_dropped() {
        let records = vec![
            record(&[("IP_ADDRESS", "10.0.0.1"), ("MAC_ADDRESS", "aabb.ccdd")]),
            record(&[("IP_ADDRESS", "999.0.0.1"), ("MAC_ADDRESS", "aabb.ccdd.eeff")]),
            record(&[("IP_ADDRESS", "10.0.0.2"), ("MAC_ADDRESS", "aabb.ccdd.eeff")]),
        ];
        let entries = entries_from_records(&records);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ip_address, "10.0.0.2");
    }

    #[test]
    fn duplicates_collapse_within_capture_by_context() {
        let records = vec![
            record(&[("IP_ADDRESS", "10.0.0.1"), ("MAC_ADDRESS", "aabb.ccdd.eeff")]),
            record(&[("IP_ADDRESS", "10.0.0.1"), ("MAC_ADDRESS", "aabb.ccdd.eeff")]),
            record(&[
                ("IP_ADDRESS", "10.0.0.1"),
                ("MAC_ADDRESS", "aabb.ccdd.eeff"),
                ("CONTEXT", "mgmt"),
            ]),
        ];
        let entries = entries_from_records(&records);
        assert_eq!(entries.len(), 2);
    }
}
