//! Neighbor-table parsing via the template engine.

use velocity_protocol::Vendor;
use velocity_templates::{filter_list, FieldValue, TemplateIndex};

/// Where a neighbor record came from. LLDP is preferred when both
/// protocols report the same adjacency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborSource {
    Lldp,
    Cdp,
}

#[derive(Debug, Clone)]
pub struct NeighborRecord {
    pub name: String,
    pub management_ip: Option<String>,
    pub platform_hint: String,
    pub local_interface: String,
    pub remote_interface: String,
    pub source: NeighborSource,
}

/// Minimum score for neighbor-table parses. Neighbor output is structured
/// enough that the fingerprint-class default applies.
const NEIGHBOR_MIN_SCORE: f64 = 20.0;

/// Parse neighbor detail output. An unparseable table yields an empty list;
/// the caller records the device as visited either way.
pub fn parse_neighbors(
    templates: &TemplateIndex,
    vendor: Vendor,
    command: &str,
    output: &str,
    source: NeighborSource,
) -> Vec<NeighborRecord> {
    let filters = filter_list(Some(vendor), command);
    let Ok(matched) = templates.find_best(output, &filters, NEIGHBOR_MIN_SCORE) else {
        return Vec::new();
    };

    matched
        .records
        .iter()
        .filter_map(|record| {
            let get = |key: &str| {
                record
                    .get(key)
                    .map(FieldValue::first)
                    .unwrap_or("")
                    .trim()
                    .to_string()
            };
            let name = get("NEIGHBOR_NAME");
            if name.is_empty() {
                return None;
            }
            let ip = get("MGMT_ADDRESS");
            Some(NeighborRecord {
                name,
                management_ip: if ip.is_empty() { None } else { Some(ip) },
                platform_hint: get("PLATFORM"),
                local_interface: get("LOCAL_INTERFACE"),
                remote_interface: get("NEIGHBOR_INTERFACE"),
                source,
            })
        })
        .collect()
}

/// Merge LLDP and CDP views of the same device's neighbors. LLDP wins on
/// conflicts (keyed by neighbor name + local interface); CDP fills in
/// adjacencies LLDP missed.
pub fn merge_neighbor_views(
    lldp: Vec<NeighborRecord>,
    cdp: Vec<NeighborRecord>,
) -> Vec<NeighborRecord> {
    let mut merged = lldp;
    for record in cdp {
        let duplicate = merged.iter().any(|existing| {
            existing.name.eq_ignore_ascii_case(&record.name)
                && (existing.local_interface == record.local_interface
                    || existing.local_interface.is_empty()
                    || record.local_interface.is_empty())
        });
        if !duplicate {
            merged.push(record);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use velocity_testkit::fixtures;

    #[test]
    fn cdp_detail_parses_into_records() {
        let templates = TemplateIndex::builtin();
        let output = fixtures::cisco_cdp_detail(&[
            ("sw2.lab", "10.0.0.2", "cisco WS-C3850-48T", "Gi1/0/1", "Gi1/0/24"),
            ("sw3.lab", "10.0.0.3", "cisco WS-C2960X", "Gi1/0/2", "Gi0/48"),
        ]);
        let records = parse_neighbors(
            &templates,
            Vendor::CiscoIos,
            "show cdp neighbors detail",
            &output,
            NeighborSource::Cdp,
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "sw2.lab");
        assert_eq!(records[0].management_ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(records[0].local_interface, "Gi1/0/1");
        assert_eq!(records[1].remote_interface, "Gi0/48");
    }

    #[test]
    fn lldp_wins_merge_conflicts() {
        let lldp = vec![NeighborRecord {
            name: "sw2.lab".into(),
            management_ip: Some("10.0.0.2".into()),
            platform_hint: "Arista Networks EOS".into(),
            local_interface: "Gi1/0/1".into(),
            remote_interface: "Ethernet49".into(),
            source: NeighborSource::Lldp,
        }];
        let cdp = vec![
            NeighborRecord {
                name: "SW2.LAB".into(),
                management_ip: Some("10.0.0.2".into()),
                platform_hint: "cisco".into(),
                local_interface: "Gi1/0/1".into(),
                remote_interface: "Gi0/0".into(),
                source: NeighborSource::Cdp,
            },
            NeighborRecord {
                name: "sw4.lab".into(),
                management_ip: None,
                platform_hint: "cisco".into(),
                local_interface: "Gi1/0/9".into(),
                remote_interface: "Gi0/1".into(),
                source: NeighborSource::Cdp,
            },
        ];
        let merged = merge_neighbor_views(lldp, cdp);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].source, NeighborSource::Lldp);
        assert_eq!(merged[1].name, "sw4.lab");
    }
}
