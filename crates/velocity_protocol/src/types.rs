//! Canonical enums shared across all crates.
//!
//! `Vendor` and `CaptureType` are table-driven: commands, paging behavior,
//! prompt patterns and template prefixes all hang off the enum so callers
//! never branch on strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::SeverityThresholds;

// ============================================================================
// Vendor
// ============================================================================

/// Network device vendor/platform family.
///
/// This is the CANONICAL definition - use this everywhere. `Unknown` is a
/// first-class variant: the fingerprint loop and collector handle it
/// uniformly (generic prompt, no paging command).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    CiscoIos,
    CiscoNxos,
    AristaEos,
    JuniperJunos,
    HpProcurve,
    #[default]
    Unknown,
}

/// Substring signatures checked against device output, most specific first.
/// NX-OS must be tested before IOS: both contain "Cisco".
const VENDOR_SIGNATURES: &[(Vendor, &[&str])] = &[
    (Vendor::CiscoNxos, &["nx-os", "cisco nexus", "nxos"]),
    (
        Vendor::CiscoIos,
        &[
            "cisco ios software",
            "cisco internetwork operating system",
            "ios software",
            "catalyst",
        ],
    ),
    (Vendor::AristaEos, &["arista networks eos", "arista", "eos version"]),
    (Vendor::JuniperJunos, &["junos", "juniper"]),
    (
        Vendor::HpProcurve,
        &[
            "image stamp",
            "procurve",
            "hewlett-packard",
            "status and counters - general system information",
            "aruba",
        ],
    ),
];

impl Vendor {
    pub const ALL: &'static [Vendor] = &[
        Vendor::CiscoIos,
        Vendor::CiscoNxos,
        Vendor::AristaEos,
        Vendor::JuniperJunos,
        Vendor::HpProcurve,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::CiscoIos => "cisco_ios",
            Vendor::CiscoNxos => "cisco_nxos",
            Vendor::AristaEos => "arista_eos",
            Vendor::JuniperJunos => "juniper_junos",
            Vendor::HpProcurve => "hp_procurve",
            Vendor::Unknown => "unknown",
        }
    }

    /// Display name used in device records ("Cisco", "Arista", ...).
    pub fn display_name(&self) -> &'static str {
        match self {
            Vendor::CiscoIos | Vendor::CiscoNxos => "Cisco",
            Vendor::AristaEos => "Arista",
            Vendor::JuniperJunos => "Juniper",
            Vendor::HpProcurve => "HP/Aruba",
            Vendor::Unknown => "Unknown",
        }
    }

    /// Detect vendor from raw command output via substring signatures.
    pub fn detect(output: &str) -> Vendor {
        let lower = output.to_lowercase();
        for (vendor, patterns) in VENDOR_SIGNATURES {
            if patterns.iter().any(|p| lower.contains(p)) {
                return *vendor;
            }
        }
        Vendor::Unknown
    }

    /// Weak hint from a CDP/LLDP platform or capability field.
    /// Overridden by fingerprinting.
    pub fn from_platform_hint(hint: &str) -> Vendor {
        Vendor::detect(hint)
    }

    /// Command that disables terminal paging, if the platform needs one.
    pub fn paging_disable(&self) -> Option<&'static str> {
        match self {
            Vendor::CiscoIos | Vendor::CiscoNxos | Vendor::AristaEos => {
                Some("terminal length 0")
            }
            Vendor::JuniperJunos => Some("set cli screen-length 0"),
            Vendor::HpProcurve => Some("no page"),
            Vendor::Unknown => None,
        }
    }

    /// Regex matching an interactive prompt line for this platform.
    pub fn prompt_pattern(&self) -> &'static str {
        match self {
            Vendor::JuniperJunos => r"[\w.@-]+[>%#]\s*$",
            Vendor::Unknown => r"[>#\$%]\s*$",
            _ => r"[\w().\/:-]+\s?[>#]\s*$",
        }
    }

    /// Identification commands tried by the fingerprint engine, in order.
    pub fn fingerprint_commands(&self) -> &'static [&'static str] {
        match self {
            Vendor::HpProcurve => &["show version", "show system info"],
            Vendor::JuniperJunos => &["show version", "show chassis hardware"],
            _ => &["show version"],
        }
    }

    /// Prefix used when building template filter lists.
    pub fn template_prefix(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "cisco_ios" | "cisco" => Ok(Vendor::CiscoIos),
            "cisco_nxos" | "nxos" => Ok(Vendor::CiscoNxos),
            "arista_eos" | "arista" => Ok(Vendor::AristaEos),
            "juniper_junos" | "juniper" => Ok(Vendor::JuniperJunos),
            "hp_procurve" | "hp" | "procurve" => Ok(Vendor::HpProcurve),
            "unknown" | "" => Ok(Vendor::Unknown),
            other => Err(format!("Invalid vendor: '{}'", other)),
        }
    }
}

// ============================================================================
// Capture types
// ============================================================================

/// What the loader does with a capture type's parsed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTarget {
    /// Hardware inventory rows (components table, replace-by-device).
    Components,
    /// ARP entries (arp_cat.db, append-only).
    ArpEntries,
    /// Raw capture only; no relational extraction.
    None,
}

/// A named class of capture in the fixed catalog.
///
/// Each type maps to an output directory, per-vendor command strings, and
/// (for the tracked set) change-history participation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureType {
    Configs,
    Version,
    Inventory,
    Arp,
    Mac,
    Lldp,
    Cdp,
    Routes,
    Interfaces,
    BgpSummary,
    BgpNeighbor,
    OspfNeighbor,
}

impl CaptureType {
    pub const ALL: &'static [CaptureType] = &[
        CaptureType::Configs,
        CaptureType::Version,
        CaptureType::Inventory,
        CaptureType::Arp,
        CaptureType::Mac,
        CaptureType::Lldp,
        CaptureType::Cdp,
        CaptureType::Routes,
        CaptureType::Interfaces,
        CaptureType::BgpSummary,
        CaptureType::BgpNeighbor,
        CaptureType::OspfNeighbor,
    ];

    /// Tracked types participate in the change-detection archive.
    /// Everything else updates "current" only - ARP/MAC/route churn would
    /// drown the change signal.
    pub const TRACKED: &'static [CaptureType] = &[
        CaptureType::Configs,
        CaptureType::Version,
        CaptureType::Inventory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureType::Configs => "configs",
            CaptureType::Version => "version",
            CaptureType::Inventory => "inventory",
            CaptureType::Arp => "arp",
            CaptureType::Mac => "mac",
            CaptureType::Lldp => "lldp",
            CaptureType::Cdp => "cdp",
            CaptureType::Routes => "routes",
            CaptureType::Interfaces => "interfaces",
            CaptureType::BgpSummary => "bgp-summary",
            CaptureType::BgpNeighbor => "bgp-neighbor",
            CaptureType::OspfNeighbor => "ospf-neighbor",
        }
    }

    /// Subdirectory under `capture/` holding this type's raw files.
    pub fn output_dir(&self) -> &'static str {
        self.as_str()
    }

    pub fn is_tracked(&self) -> bool {
        Self::TRACKED.contains(self)
    }

    /// Command string for a vendor, or None when the platform has no
    /// equivalent (the job batcher skips the pair).
    pub fn command_for(&self, vendor: Vendor) -> Option<&'static str> {
        let cmd = match (self, vendor) {
            (CaptureType::Configs, Vendor::JuniperJunos) => "show configuration",
            (CaptureType::Configs, _) => "show running-config",
            (CaptureType::Version, _) => "show version",
            (CaptureType::Inventory, Vendor::JuniperJunos) => "show chassis hardware",
            (CaptureType::Inventory, Vendor::HpProcurve) => "show system info",
            (CaptureType::Inventory, _) => "show inventory",
            (CaptureType::Arp, Vendor::JuniperJunos) => "show arp",
            (CaptureType::Arp, Vendor::HpProcurve) => "show arp",
            (CaptureType::Arp, _) => "show ip arp",
            (CaptureType::Mac, Vendor::JuniperJunos) => "show ethernet-switching table",
            (CaptureType::Mac, _) => "show mac address-table",
            (CaptureType::Lldp, _) => "show lldp neighbors detail",
            (CaptureType::Cdp, Vendor::JuniperJunos) => return None,
            (CaptureType::Cdp, Vendor::HpProcurve) => return None,
            (CaptureType::Cdp, _) => "show cdp neighbors detail",
            (CaptureType::Routes, Vendor::JuniperJunos) => "show route",
            (CaptureType::Routes, _) => "show ip route",
            (CaptureType::Interfaces, Vendor::JuniperJunos) => "show interfaces terse",
            (CaptureType::Interfaces, _) => "show interfaces status",
            (CaptureType::BgpSummary, Vendor::JuniperJunos) => "show bgp summary",
            (CaptureType::BgpSummary, _) => "show ip bgp summary",
            (CaptureType::BgpNeighbor, Vendor::JuniperJunos) => "show bgp neighbor",
            (CaptureType::BgpNeighbor, _) => "show ip bgp neighbors",
            (CaptureType::OspfNeighbor, Vendor::JuniperJunos) => "show ospf neighbor",
            (CaptureType::OspfNeighbor, _) => "show ip ospf neighbor",
        };
        Some(cmd)
    }

    /// Where parsed records land.
    pub fn parse_target(&self) -> ParseTarget {
        match self {
            CaptureType::Inventory => ParseTarget::Components,
            CaptureType::Arp => ParseTarget::ArpEntries,
            _ => ParseTarget::None,
        }
    }

    /// Default minimum template score accepted by the loader for this type.
    /// Overridable via `[scoring]` config.
    pub fn default_min_score(&self) -> f64 {
        match self {
            CaptureType::Arp => 25.0,
            _ => 20.0,
        }
    }

    /// Parse a comma-separated list as given on the CLI.
    pub fn parse_list(input: &str) -> Result<Vec<CaptureType>, String> {
        let mut out = Vec::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let ct = part.parse::<CaptureType>()?;
            if !out.contains(&ct) {
                out.push(ct);
            }
        }
        if out.is_empty() {
            return Err("no capture types given".to_string());
        }
        Ok(out)
    }
}

impl fmt::Display for CaptureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CaptureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "configs" | "config" => Ok(CaptureType::Configs),
            "version" => Ok(CaptureType::Version),
            "inventory" => Ok(CaptureType::Inventory),
            "arp" => Ok(CaptureType::Arp),
            "mac" => Ok(CaptureType::Mac),
            "lldp" | "lldp-detail" => Ok(CaptureType::Lldp),
            "cdp" => Ok(CaptureType::Cdp),
            "routes" => Ok(CaptureType::Routes),
            "interfaces" | "int-status" => Ok(CaptureType::Interfaces),
            "bgp-summary" => Ok(CaptureType::BgpSummary),
            "bgp-neighbor" => Ok(CaptureType::BgpNeighbor),
            "ospf-neighbor" => Ok(CaptureType::OspfNeighbor),
            other => Err(format!("Unknown capture type: '{}'", other)),
        }
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Change severity, classified by capture type and diff size only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Critical => "critical",
        }
    }

    /// Deterministic severity rules, applied in order. Pure function of the
    /// three inputs plus configured thresholds.
    pub fn classify(
        capture_type: CaptureType,
        lines_added: i64,
        lines_removed: i64,
        thresholds: &SeverityThresholds,
    ) -> Severity {
        let total = lines_added + lines_removed;
        match capture_type {
            CaptureType::Version => Severity::Critical,
            CaptureType::Configs if total > thresholds.configs_critical => Severity::Critical,
            CaptureType::Inventory if total > thresholds.inventory_critical => Severity::Critical,
            CaptureType::Configs => Severity::Moderate,
            CaptureType::Inventory => Severity::Moderate,
            _ => Severity::Minor,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minor" => Ok(Severity::Minor),
            "moderate" => Ok(Severity::Moderate),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("Invalid severity: '{}'", other)),
        }
    }
}
