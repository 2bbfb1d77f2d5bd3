//! Canned device output used across the test suites.

/// Cisco IOS `show version` for a given hostname/version/serial.
pub fn cisco_show_version(hostname: &str, version: &str, serial: &str) -> String {
    format!(
        "Cisco IOS Software, C3850 Software (CAT3K_CAA-UNIVERSALK9-M), Version {version}, RELEASE SOFTWARE (fc5)\n\
         Technical Support: http://www.cisco.com/techsupport\n\
         Copyright (c) 1986-2020 by Cisco Systems, Inc.\n\
         \n\
         {hostname} uptime is 41 weeks, 6 days, 1 hour, 32 minutes\n\
         System returned to ROM by power-on\n\
         \n\
         Model Number                       : WS-C3850-48T\n\
         System Serial Number               : {serial}\n\
         Configuration register is 0x102\n"
    )
}

pub fn arista_show_version(version: &str, serial: &str) -> String {
    format!(
        "Arista DCS-7050SX3-48YC8\n\
         Hardware version: 11.03\n\
         Serial number: {serial}\n\
         System MAC address: 2899.3a01.aabb\n\
         \n\
         Software image version: {version}\n\
         Architecture: x86_64\n\
         Internal build version: {version}-2GB\n"
    )
}

pub fn hp_show_version() -> String {
    "Image stamp:    /ws/swbuild/rel_tacoma_qaoff/code/build/anm\n\
     \tDec  4 2017 15:30:31\n\
     \tWC.16.04.0008\n\
     \t398\n\
     Boot Image:     Primary\n"
        .to_string()
}

pub fn hp_show_system_info(hostname: &str, serial: &str) -> String {
    format!(
        " Status and Counters - General System Information\n\
         \n\
           System Name        : {hostname}\n\
           System Contact     :\n\
           System Location    :\n\
         \n\
           MAC Age Time (sec) : 300\n\
         \n\
           Time Zone          : 0\n\
         \n\
           Software revision  : WC.16.04.0008\n\
           ROM Version        : WC.16.01.0005\n\
         \n\
           Up Time            : 122 days\n\
           CPU Util (%)       : 5\n\
         \n\
           Serial Number      : {serial}\n\
           Memory   - Total   : 155,459,584\n\
         \n\
           Base MAC Addr      : aabbcc-ddeeff\n"
    )
}

/// CDP neighbor detail entries. Each tuple is
/// (neighbor_name, neighbor_ip, platform, local_intf, remote_intf).
pub fn cisco_cdp_detail(neighbors: &[(&str, &str, &str, &str, &str)]) -> String {
    let mut out = String::new();
    for (name, ip, platform, local, remote) in neighbors {
        out.push_str(&format!(
            "-------------------------\n\
             Device ID: {name}\n\
             Entry address(es):\n\
             \x20 IP address: {ip}\n\
             Platform: {platform},  Capabilities: Router Switch IGMP\n\
             Interface: {local},  Port ID (outgoing port): {remote}\n\
             Holdtime : 133 sec\n\n"
        ));
    }
    out
}

/// LLDP neighbor detail entries. Each tuple is
/// (local_intf, neighbor_name, neighbor_port, mgmt_ip, sys_descr).
pub fn lldp_detail(neighbors: &[(&str, &str, &str, &str, &str)]) -> String {
    let mut out = String::new();
    for (local, name, port, ip, descr) in neighbors {
        out.push_str(&format!(
            "------------------------------------------------\n\
             Local Intf: {local}\n\
             Chassis id: 00aa.bb11.cc01\n\
             Port id: {port}\n\
             Port Description: uplink\n\
             System Name: {name}\n\
             \n\
             {descr}\n\
             \n\
             Time remaining: 98 seconds\n\
             System Capabilities: B,R\n\
             Enabled Capabilities: R\n\
             Management Addresses:\n\
             \x20   IP: {ip}\n"
        ));
    }
    out
}

pub fn cisco_arp_output(entries: &[(&str, &str, &str)]) -> String {
    let mut out =
        String::from("Protocol  Address          Age (min)  Hardware Addr   Type   Interface\n");
    for (ip, mac, intf) in entries {
        out.push_str(&format!(
            "Internet  {ip:<16} 5          {mac}  ARPA   {intf}\n"
        ));
    }
    out
}

pub fn hp_arp_output(entries: &[(&str, &str, &str)]) -> String {
    let mut out = String::from(
        " IP ARP table\n\n  IP Address      MAC Address       Type    Port\n  --------------- ----------------- ------- ----\n",
    );
    for (ip, mac, port) in entries {
        out.push_str(&format!("  {ip:<15} {mac}     dynamic {port}\n"));
    }
    out
}

pub fn juniper_arp_output(entries: &[(&str, &str, &str)]) -> String {
    let mut out = String::from("MAC Address       Address         Interface\n");
    for (ip, mac, intf) in entries {
        out.push_str(&format!("{mac} {ip:<15} {intf}\n"));
    }
    out
}

pub fn cisco_inventory(components: &[(&str, &str, &str, &str)]) -> String {
    let mut out = String::new();
    for (name, descr, pid, sn) in components {
        out.push_str(&format!(
            "NAME: \"{name}\", DESCR: \"{descr}\"\n\
             PID: {pid}      , VID: V07  , SN: {sn}\n\n"
        ));
    }
    out
}

/// A small running config; `extra_lines` lets change tests grow it.
pub fn running_config(hostname: &str, extra_lines: &[&str]) -> String {
    let mut out = format!(
        "Building configuration...\n\
         \n\
         version 16.12\n\
         hostname {hostname}\n\
         !\n\
         interface Vlan20\n\
         \x20ip address 10.10.20.1 255.255.255.0\n\
         !\n\
         line vty 0 4\n\
         \x20transport input ssh\n\
         !\n"
    );
    for line in extra_lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("end\n");
    out
}
