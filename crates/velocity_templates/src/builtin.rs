//! Builtin template library.
//!
//! Covers the platform identification, inventory, ARP and neighbor-discovery
//! commands of the supported vendors. Site-local additions go in a template
//! directory loaded with `TemplateIndex::load_dir`.
//!
//! Field naming follows the conventions the extraction layer's priority
//! lists expect: `VERSION`/`SOFTWARE_VERSION`, `MODEL`/`HARDWARE`/`PID`,
//! `SERIAL_NUMBER`/`SERIAL`/`SN`, `MAC_ADDRESS`/`HARDWARE_ADDR`,
//! `IP_ADDRESS`/`ADDRESS`, `INTERFACE`/`PORT`.

/// Every builtin template, name then source.
pub fn all() -> Vec<(&'static str, &'static str)> {
    vec![
        ("cisco_ios_show_version", CISCO_IOS_SHOW_VERSION),
        ("cisco_nxos_show_version", CISCO_NXOS_SHOW_VERSION),
        ("arista_eos_show_version", ARISTA_EOS_SHOW_VERSION),
        ("juniper_junos_show_version", JUNIPER_JUNOS_SHOW_VERSION),
        ("hp_procurve_show_version", HP_PROCURVE_SHOW_VERSION),
        ("hp_procurve_show_system_info", HP_PROCURVE_SHOW_SYSTEM_INFO),
        ("cisco_ios_show_inventory", CISCO_IOS_SHOW_INVENTORY),
        ("cisco_nxos_show_inventory", CISCO_NXOS_SHOW_INVENTORY),
        ("arista_eos_show_inventory", ARISTA_EOS_SHOW_INVENTORY),
        (
            "juniper_junos_show_chassis_hardware",
            JUNIPER_JUNOS_SHOW_CHASSIS_HARDWARE,
        ),
        ("cisco_ios_show_ip_arp", CISCO_IOS_SHOW_IP_ARP),
        ("cisco_nxos_show_ip_arp", CISCO_NXOS_SHOW_IP_ARP),
        ("arista_eos_show_ip_arp", ARISTA_EOS_SHOW_IP_ARP),
        ("juniper_junos_show_arp", JUNIPER_JUNOS_SHOW_ARP),
        ("hp_procurve_show_arp", HP_PROCURVE_SHOW_ARP),
        (
            "cisco_ios_show_cdp_neighbors_detail",
            CISCO_IOS_SHOW_CDP_NEIGHBORS_DETAIL,
        ),
        ("show_lldp_neighbors_detail", SHOW_LLDP_NEIGHBORS_DETAIL),
    ]
}

const CISCO_IOS_SHOW_VERSION: &str = r#"
Value Required VERSION ([^,\s]+)
Value HOSTNAME (\S+)
Value UPTIME (.+)
Value List SERIAL (\S+)
Value List HARDWARE (\S+)
Value CONFIG_REGISTER (\S+)

Start
  ^Cisco IOS Software.*Version ${VERSION}
  ^.*IOS.*Software.*Version ${VERSION}
  ^${HOSTNAME} uptime is ${UPTIME}
  ^System [Ss]erial [Nn]umber\s+:\s+${SERIAL}
  ^Processor board ID ${SERIAL}
  ^[Mm]odel [Nn]umber\s+:\s+${HARDWARE}
  ^[Cc]isco ${HARDWARE} \(.+\) processor
  ^Configuration register is ${CONFIG_REGISTER}
"#;

const CISCO_NXOS_SHOW_VERSION: &str = r#"
Value Required VERSION (\S+)
Value HOSTNAME (\S+)
Value MODEL (\S+)
Value SERIAL (\S+)
Value UPTIME (.+)

Start
  ^\s+(?:NXOS|system):\s+version ${VERSION}
  ^\s+Device name:\s+${HOSTNAME}
  ^\s+cisco Nexus\S* ${MODEL} (?:Chassis|chassis)
  ^\s+Processor Board ID ${SERIAL}
  ^Kernel uptime is ${UPTIME}
"#;

const ARISTA_EOS_SHOW_VERSION: &str = r#"
Value MODEL (\S+)
Value Required SOFTWARE_VERSION (\S+)
Value SERIAL_NUMBER (\S+)
Value SYSTEM_MAC ((?:[0-9a-fA-F]{2,4}[:.-]){2,5}[0-9a-fA-F]{2,4})
Value HW_VERSION (\S+)

Start
  ^Arista ${MODEL}$
  ^Software image version:\s+${SOFTWARE_VERSION}
  ^Serial number:\s+${SERIAL_NUMBER}
  ^System MAC address:\s+${SYSTEM_MAC}
  ^Hardware version:\s+${HW_VERSION}
"#;

const JUNIPER_JUNOS_SHOW_VERSION: &str = r#"
Value HOSTNAME (\S+)
Value MODEL (\S+)
Value Required VERSION (\S+)

Start
  ^Hostname:\s+${HOSTNAME}
  ^Model:\s+${MODEL}
  ^Junos:\s+${VERSION}
  ^JUNOS .*\[${VERSION}\]
"#;

// ProCurve `show version` carries no serial; the fingerprint engine
// follows up with `show system info`.
const HP_PROCURVE_SHOW_VERSION: &str = r#"
Value Required VERSION ([A-Z]{1,3}\.[\d.]+\S*)
Value ROM_VERSION (\S+)

Start
  ^\s+${VERSION}$
  ^Software revision\s+:\s+${VERSION}
  ^ROM [Vv]ersion\s+:\s+${ROM_VERSION}
  ^Boot ROM Version\s+:\s+${ROM_VERSION}
"#;

const HP_PROCURVE_SHOW_SYSTEM_INFO: &str = r#"
Value HOSTNAME (\S+)
Value VERSION (\S+)
Value ROM_VERSION (\S+)
Value Required SERIAL_NUMBER (\S+)
Value UPTIME (.+?)
Value HARDWARE_ADDR ([0-9a-fA-F-]+)

Start
  ^\s*System Name\s+:\s+${HOSTNAME}
  ^\s*Software revision\s+:\s+${VERSION}
  ^\s*ROM Version\s+:\s+${ROM_VERSION}
  ^\s*Serial Number\s+:\s+${SERIAL_NUMBER}
  ^\s*Up Time\s+:\s+${UPTIME}\s*$
  ^\s*Base MAC Addr\s+:\s+${HARDWARE_ADDR}
"#;

const CISCO_IOS_SHOW_INVENTORY: &str = r#"
Value Required NAME (.+?)
Value DESCR (.+?)
Value PID (\S+)
Value VID (\S+)
Value SN (\S+)

Start
  ^NAME:\s+"${NAME}",\s+DESCR:\s+"${DESCR}"
  ^PID:\s+${PID}\s*,\s+VID:\s+${VID}\s*,\s+SN:\s+${SN} -> Record
  ^PID:\s+${PID}\s*,\s+VID:\s+${VID} -> Record
"#;

const CISCO_NXOS_SHOW_INVENTORY: &str = r#"
Value Required NAME (.+?)
Value DESCR (.+?)
Value PID (\S+)
Value VID (\S+)
Value SN (\S+)

Start
  ^NAME:\s+"${NAME}",\s+DESCR:\s+"${DESCR}"
  ^PID:\s+${PID}\s*,\s+VID:\s+${VID}\s*,\s+SN:\s+${SN} -> Record
"#;

const ARISTA_EOS_SHOW_INVENTORY: &str = r#"
Value Required NAME (.+?)
Value DESCR (.+?)
Value PID (\S+)
Value SN (\S+)

Start
  ^NAME:\s+"${NAME}",\s+DESCR:\s+"${DESCR}"
  ^PID:\s+${PID}\s*,.*SN:\s+${SN} -> Record
"#;

const JUNIPER_JUNOS_SHOW_CHASSIS_HARDWARE: &str = r#"
Value Required NAME (\S+(?: \S+)*?)
Value VERSION (REV \S+)
Value PART_NUMBER (\S+)
Value SERIAL_NUMBER (\S+)
Value DESCRIPTION (.+)

Start
  ^Hardware inventory:
  ^Item\s+Version\s+Part number
  ^${NAME}\s{2,}${VERSION}\s+${PART_NUMBER}\s+${SERIAL_NUMBER}\s+${DESCRIPTION} -> Record
  ^${NAME}\s{2,}${SERIAL_NUMBER}\s{2,}${DESCRIPTION} -> Record
"#;

const CISCO_IOS_SHOW_IP_ARP: &str = r#"
Value PROTOCOL (\S+)
Value Required ADDRESS (\d+\.\d+\.\d+\.\d+)
Value AGE (\S+)
Value Required MAC_ADDRESS ([0-9a-fA-F]{4}\.[0-9a-fA-F]{4}\.[0-9a-fA-F]{4})
Value TYPE (\S+)
Value INTERFACE (\S+)

Start
  ^${PROTOCOL}\s+${ADDRESS}\s+${AGE}\s+${MAC_ADDRESS}\s+${TYPE}\s+${INTERFACE} -> Record
  ^${PROTOCOL}\s+${ADDRESS}\s+${AGE}\s+${MAC_ADDRESS}\s+${TYPE} -> Record
"#;

const CISCO_NXOS_SHOW_IP_ARP: &str = r#"
Value Filldown CONTEXT (\S+)
Value Required ADDRESS (\d+\.\d+\.\d+\.\d+)
Value AGE (\S+)
Value Required MAC_ADDRESS ([0-9a-fA-F]{4}\.[0-9a-fA-F]{4}\.[0-9a-fA-F]{4})
Value INTERFACE (\S+)

Start
  ^IP ARP Table for context ${CONTEXT}$
  ^${ADDRESS}\s+${AGE}\s+${MAC_ADDRESS}\s+${INTERFACE} -> Record
"#;

const ARISTA_EOS_SHOW_IP_ARP: &str = r#"
Value Required IP_ADDRESS (\d+\.\d+\.\d+\.\d+)
Value AGE (\S+)
Value Required MAC_ADDRESS ([0-9a-fA-F]{4}\.[0-9a-fA-F]{4}\.[0-9a-fA-F]{4})
Value INTERFACE (\S+(?:,\s*\S+)*)

Start
  ^${IP_ADDRESS}\s+${AGE}\s+${MAC_ADDRESS}\s+${INTERFACE} -> Record
"#;

const JUNIPER_JUNOS_SHOW_ARP: &str = r#"
Value Required MAC_ADDRESS ([0-9a-fA-F]{2}(?::[0-9a-fA-F]{2}){5})
Value Required ADDRESS (\d+\.\d+\.\d+\.\d+)
Value INTERFACE (\S+)

Start
  ^${MAC_ADDRESS}\s+${ADDRESS}\s+\S+\s+${INTERFACE} -> Record
  ^${MAC_ADDRESS}\s+${ADDRESS}\s+${INTERFACE} -> Record
"#;

const HP_PROCURVE_SHOW_ARP: &str = r#"
Value Required IP_ADDRESS (\d+\.\d+\.\d+\.\d+)
Value Required MAC_ADDRESS ([0-9a-fA-F]{6}-[0-9a-fA-F]{6})
Value TYPE (\S+)
Value PORT (\S+)

Start
  ^\s+${IP_ADDRESS}\s+${MAC_ADDRESS}\s+${TYPE}\s+${PORT} -> Record
  ^\s+${IP_ADDRESS}\s+${MAC_ADDRESS}\s+${TYPE} -> Record
"#;

const CISCO_IOS_SHOW_CDP_NEIGHBORS_DETAIL: &str = r#"
Value Required NEIGHBOR_NAME (\S+)
Value MGMT_ADDRESS (\d+\.\d+\.\d+\.\d+)
Value PLATFORM (.+?)
Value CAPABILITIES (.+)
Value LOCAL_INTERFACE (\S+?)
Value NEIGHBOR_INTERFACE (\S+)

Start
  ^Device ID:\s*${NEIGHBOR_NAME}
  ^\s+IP address:\s+${MGMT_ADDRESS}
  ^Platform:\s*${PLATFORM}\s*,\s+Capabilities:\s+${CAPABILITIES}$
  ^Interface:\s*${LOCAL_INTERFACE},\s+Port ID \(outgoing port\):\s+${NEIGHBOR_INTERFACE}
  ^-{5,} -> Record
"#;

// LLDP detail output is near-identical across the supported platforms;
// one generic template serves them all through the command-level filter.
const SHOW_LLDP_NEIGHBORS_DETAIL: &str = r#"
Value LOCAL_INTERFACE (\S+)
Value NEIGHBOR_INTERFACE (.+?)
Value Required NEIGHBOR_NAME (\S+)
Value PLATFORM ((?:Cisco|Arista|Juniper|HP|Aruba|ProCurve).*)
Value CAPABILITIES (.+)
Value MGMT_ADDRESS (\d+\.\d+\.\d+\.\d+)

Start
  ^Local Intf:\s+${LOCAL_INTERFACE}
  ^Port id:\s+${NEIGHBOR_INTERFACE}$
  ^System Name:\s+${NEIGHBOR_NAME}
  ^${PLATFORM}$
  ^Enabled Capabilities:\s+${CAPABILITIES}
  ^System Capabilities:\s+${CAPABILITIES}
  ^\s+IP:\s+${MGMT_ADDRESS}
  ^-{5,} -> Record
"#;
