//! The BFS crawler.

use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use velocity_net::transport::{
    Credentials, DeviceConnector, DeviceSession, SshTarget, TransportError,
};
use velocity_protocol::inventory::{InventoryFolder, InventorySession, SessionsFile};
use velocity_protocol::paths::DataLayout;
use velocity_protocol::{normalize_name, CaptureType, EventSink, JobId, ProgressEvent, Vendor};
use velocity_templates::TemplateIndex;

use crate::neighbors::{merge_neighbor_views, parse_neighbors, NeighborSource};
use crate::topology::{Topology, TopologyEdge};

/// SSH attempts per peer before it is marked failed.
const CONNECT_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("seed {ip} unreachable: {reason}")]
    SeedUnreachable { ip: String, reason: String },

    #[error("authentication to seed {ip} failed: {reason}")]
    SeedAuthFailed { ip: String, reason: String },

    #[error("failed to write discovery artifacts: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Inventory(#[from] velocity_protocol::inventory::InventoryError),
}

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Site grouping for the inventory folder and topology naming.
    pub site_name: String,
    /// BFS depth limit; None walks the whole connected component.
    pub max_depth: Option<usize>,
    /// Upper bound on visited devices.
    pub max_devices: usize,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            site_name: "network".to_string(),
            max_depth: None,
            max_devices: 100,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FailedPeer {
    pub name: String,
    pub ip: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct DiscoveryReport {
    pub job_id: JobId,
    pub inventory_path: PathBuf,
    pub topology_path: PathBuf,
    pub device_count: usize,
    pub failed_peers: Vec<FailedPeer>,
}

/// One queued BFS hop.
struct Hop {
    name: Option<String>,
    ip: String,
    depth: usize,
}

/// Outcome of one device visit.
struct Visit {
    hostname: String,
    vendor: Vendor,
    neighbors: Vec<crate::neighbors::NeighborRecord>,
}

pub struct Crawler {
    connector: Arc<dyn DeviceConnector>,
    templates: TemplateIndex,
}

impl Crawler {
    pub fn new(connector: Arc<dyn DeviceConnector>) -> Self {
        Self {
            connector,
            templates: TemplateIndex::builtin(),
        }
    }

    pub fn with_templates(connector: Arc<dyn DeviceConnector>, templates: TemplateIndex) -> Self {
        Self {
            connector,
            templates,
        }
    }

    /// Crawl from the seed and write `sessions.yaml` + `network.json`.
    ///
    /// The crawl is successful iff the seed was reachable; individual peer
    /// failures are collected in the report, never fatal.
    pub fn discover(
        &self,
        seed_ip: &str,
        credentials: &Credentials,
        options: &DiscoveryOptions,
        layout: &DataLayout,
        sink: &dyn EventSink,
    ) -> Result<DiscoveryReport, DiscoveryError> {
        let job_id = JobId::generate();
        info!(job_id = %job_id, seed = seed_ip, "starting discovery crawl");

        let mut topology = Topology::default();
        let mut visited_names: HashSet<String> = HashSet::new();
        let mut seen_ips: HashSet<String> = HashSet::new();
        let mut sessions: Vec<InventorySession> = Vec::new();
        let mut failed_peers: Vec<FailedPeer> = Vec::new();

        let mut queue: VecDeque<Hop> = VecDeque::new();
        queue.push_back(Hop {
            name: None,
            ip: seed_ip.to_string(),
            depth: 0,
        });
        seen_ips.insert(seed_ip.to_string());

        let mut succeeded = 0usize;
        let mut is_seed = true;

        while let Some(hop) = queue.pop_front() {
            if visited_names.len() >= options.max_devices {
                warn!(max = options.max_devices, "device limit reached, stopping crawl");
                break;
            }

            let display_name = hop.name.clone().unwrap_or_else(|| hop.ip.clone());
            sink.emit(&ProgressEvent::DeviceStart {
                job_id: job_id.clone(),
                device_name: display_name.clone(),
                ip_address: hop.ip.clone(),
            });

            match self.visit(&hop.ip, credentials, options) {
                Ok(visit) => {
                    let name = normalize_name(if visit.hostname.is_empty() {
                        &display_name
                    } else {
                        &visit.hostname
                    });
                    if !visited_names.insert(name.clone()) {
                        // Another IP led to an already-visited device.
                        sink.emit(&ProgressEvent::DeviceComplete {
                            job_id: job_id.clone(),
                            device_name: name,
                            success: true,
                            message: "already visited".to_string(),
                        });
                        continue;
                    }
                    succeeded += 1;
                    is_seed = false;

                    topology.add_node(&name, &hop.ip, visit.vendor.as_str(), true);
                    let mut session = InventorySession::new(&name, &hop.ip);
                    if visit.vendor != Vendor::Unknown {
                        // Weak signal until the fingerprint pass confirms.
                        session.vendor = visit.vendor.display_name().to_string();
                        session.platform = visit.vendor.as_str().to_string();
                    }
                    sessions.push(session);

                    for neighbor in &visit.neighbors {
                        let neighbor_name = normalize_name(&neighbor.name);
                        topology.add_node(
                            &neighbor_name,
                            neighbor.management_ip.as_deref().unwrap_or(""),
                            &neighbor.platform_hint,
                            false,
                        );
                        topology.add_edge(TopologyEdge {
                            local_device: name.clone(),
                            local_interface: neighbor.local_interface.clone(),
                            remote_device: neighbor_name.clone(),
                            remote_interface: neighbor.remote_interface.clone(),
                        });

                        let Some(ip) = &neighbor.management_ip else {
                            // Recorded in topology only; nothing to connect to.
                            continue;
                        };
                        let next_depth = hop.depth + 1;
                        if let Some(limit) = options.max_depth {
                            if next_depth > limit {
                                continue;
                            }
                        }
                        if visited_names.contains(&neighbor_name) || !seen_ips.insert(ip.clone()) {
                            continue;
                        }
                        queue.push_back(Hop {
                            name: Some(neighbor_name),
                            ip: ip.clone(),
                            depth: next_depth,
                        });
                    }

                    sink.emit(&ProgressEvent::DeviceComplete {
                        job_id: job_id.clone(),
                        device_name: name,
                        success: true,
                        message: format!("{} neighbors", visit.neighbors.len()),
                    });
                }
                Err(err) => {
                    if is_seed {
                        // Nothing was discovered; the crawl itself failed.
                        return Err(match &err {
                            TransportError::Auth { .. } => DiscoveryError::SeedAuthFailed {
                                ip: hop.ip,
                                reason: err.to_string(),
                            },
                            _ => DiscoveryError::SeedUnreachable {
                                ip: hop.ip,
                                reason: err.to_string(),
                            },
                        });
                    }
                    let name = normalize_name(&display_name);
                    warn!(device = %name, ip = %hop.ip, error = %err, "peer visit failed");
                    failed_peers.push(FailedPeer {
                        name: name.clone(),
                        ip: hop.ip.clone(),
                        reason: err.to_string(),
                    });
                    // Keep the entry so a later fingerprint pass can retry.
                    sessions.push(InventorySession::new(&name, &hop.ip));
                    sink.emit(&ProgressEvent::DeviceComplete {
                        job_id: job_id.clone(),
                        device_name: name,
                        success: false,
                        message: err.to_string(),
                    });
                }
            }
        }

        topology.finalize();
        topology.generated_at = chrono::Utc::now().to_rfc3339();
        sessions.sort_by(|a, b| a.name.cmp(&b.name));

        let inventory = SessionsFile {
            folders: vec![InventoryFolder {
                folder_name: options.site_name.clone(),
                sessions,
            }],
        };

        let inventory_path = layout.sessions_file();
        let topology_path = layout.topology_file();
        inventory.save(&inventory_path)?;
        topology.save(&topology_path)?;

        sink.emit(&ProgressEvent::Summary {
            job_id: job_id.clone(),
            devices_succeeded: succeeded,
            devices_failed: failed_peers.len(),
            captures_created: Default::default(),
            execution_time_secs: 0.0,
        });

        info!(
            job_id = %job_id,
            devices = succeeded,
            failed = failed_peers.len(),
            "discovery crawl complete"
        );

        Ok(DiscoveryReport {
            job_id,
            inventory_path,
            topology_path,
            device_count: succeeded,
            failed_peers,
        })
    }

    /// Connect (with retries) and interrogate one device.
    fn visit(
        &self,
        ip: &str,
        credentials: &Credentials,
        options: &DiscoveryOptions,
    ) -> Result<Visit, TransportError> {
        let mut session = self.connect_with_retries(ip, credentials, options)?;
        let result = self.interrogate(session.as_mut(), options);
        session.close();
        result
    }

    fn connect_with_retries(
        &self,
        ip: &str,
        credentials: &Credentials,
        options: &DiscoveryOptions,
    ) -> Result<Box<dyn DeviceSession>, TransportError> {
        let mut target = SshTarget::new(ip, 22, credentials.clone());
        target.connect_timeout = options.connect_timeout;

        let mut last_err = None;
        for _ in 0..CONNECT_ATTEMPTS {
            match self.connector.connect(&target) {
                Ok(session) => return Ok(session),
                Err(err @ TransportError::Auth { .. }) => return Err(err),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or(TransportError::Io("connect failed".to_string())))
    }

    fn interrogate(
        &self,
        session: &mut dyn DeviceSession,
        options: &DiscoveryOptions,
    ) -> Result<Visit, TransportError> {
        let generic_prompt = Regex::new(Vendor::Unknown.prompt_pattern())
            .map_err(|e| TransportError::Io(e.to_string()))?;

        // Platform-detection probe; also consumes the login banner.
        let probe = session.run_sequence(
            &["show version".to_string()],
            &generic_prompt,
            options.command_timeout,
        )?;
        let vendor = Vendor::detect(&probe.output);
        let hostname = hostname_from_prompt(&probe.output, &generic_prompt);

        let prompt = Regex::new(vendor.prompt_pattern())
            .map_err(|e| TransportError::Io(e.to_string()))?;

        if let Some(paging) = vendor.paging_disable() {
            session.send_line(paging)?;
            session.read_until_prompts(&prompt, 1, options.command_timeout)?;
        }

        let mut lldp_records = Vec::new();
        if let Some(command) = CaptureType::Lldp.command_for(vendor) {
            session.send_line(command)?;
            let output = session.read_until_prompts(&prompt, 1, options.command_timeout)?;
            lldp_records = parse_neighbors(
                &self.templates,
                vendor,
                command,
                &output.output,
                NeighborSource::Lldp,
            );
        }

        let mut cdp_records = Vec::new();
        if let Some(command) = CaptureType::Cdp.command_for(vendor) {
            session.send_line(command)?;
            let output = session.read_until_prompts(&prompt, 1, options.command_timeout)?;
            cdp_records = parse_neighbors(
                &self.templates,
                vendor,
                command,
                &output.output,
                NeighborSource::Cdp,
            );
        }

        Ok(Visit {
            hostname,
            vendor,
            neighbors: merge_neighbor_views(lldp_records, cdp_records),
        })
    }
}

/// Derive the device's own hostname from its prompt line ("sw1#" -> sw1).
fn hostname_from_prompt(output: &str, prompt: &Regex) -> String {
    output
        .lines()
        .rev()
        .find(|line| prompt.is_match(line))
        .map(|line| {
            line.trim()
                .trim_end_matches(['>', '#', '$', '%'])
                .trim()
                .to_string()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use velocity_protocol::{ChannelSink, NullSink};
    use velocity_testkit::{fixtures, MockConnector, MockDevice};

    fn lab_network() -> MockConnector {
        let connector = MockConnector::new();

        // sw1 (seed) sees sw2 and sw3 over CDP; sw2 sees sw1 and sw3;
        // sw3 has no CDP neighbors of its own.
        connector.add_device(
            &["10.0.0.1"],
            MockDevice::new("sw1")
                .with_output(
                    "show version",
                    fixtures::cisco_show_version("sw1", "16.12.04", "FCW1111A1AA"),
                )
                .with_output("terminal length 0", "")
                .with_output("show lldp neighbors detail", "")
                .with_output(
                    "show cdp neighbors detail",
                    fixtures::cisco_cdp_detail(&[
                        ("sw2.lab", "10.0.0.2", "cisco WS-C3850-48T", "Gi1/0/1", "Gi1/0/24"),
                        ("sw3.lab", "10.0.0.3", "cisco WS-C2960X", "Gi1/0/2", "Gi0/48"),
                    ]),
                ),
        );
        connector.add_device(
            &["10.0.0.2"],
            MockDevice::new("sw2.lab")
                .with_output(
                    "show version",
                    fixtures::cisco_show_version("sw2.lab", "16.12.04", "FCW2222B2BB"),
                )
                .with_output("terminal length 0", "")
                .with_output("show lldp neighbors detail", "")
                .with_output(
                    "show cdp neighbors detail",
                    fixtures::cisco_cdp_detail(&[(
                        "sw3.lab",
                        "10.0.0.3",
                        "cisco WS-C2960X",
                        "Gi1/0/3",
                        "Gi0/47",
                    )]),
                ),
        );
        connector.add_device(
            &["10.0.0.3"],
            MockDevice::new("sw3.lab")
                .with_output(
                    "show version",
                    fixtures::cisco_show_version("sw3.lab", "15.2(7)E3", "FOC3333C3CC"),
                )
                .with_output("terminal length 0", "")
                .with_output("show lldp neighbors detail", "")
                .with_output("show cdp neighbors detail", ""),
        );
        connector
    }

    fn options() -> DiscoveryOptions {
        DiscoveryOptions {
            site_name: "lab".into(),
            ..Default::default()
        }
    }

    fn creds() -> Credentials {
        Credentials::password("admin", "pw")
    }

    #[test]
    fn bfs_discovers_the_connected_component() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let connector = lab_network();
        let crawler = Crawler::new(Arc::new(connector));

        let (tx, rx) = mpsc::channel();
        let sink = ChannelSink::new(tx);
        let report = crawler
            .discover("10.0.0.1", &creds(), &options(), &layout, &sink)
            .unwrap();

        assert_eq!(report.device_count, 3);
        assert!(report.failed_peers.is_empty());

        let inventory = SessionsFile::load(&report.inventory_path).unwrap();
        let names: Vec<&str> = inventory.all_sessions().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["sw1", "sw2.lab", "sw3.lab"]);

        let topology = Topology::load(&report.topology_path).unwrap();
        assert_eq!(topology.nodes.len(), 3);
        assert!(topology.nodes["sw1"].visited);
        assert_eq!(topology.edges.len(), 3);

        // Event stream: every device_start has a matching device_complete.
        let events: Vec<_> = rx.try_iter().collect();
        let starts = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::DeviceStart { .. }))
            .count();
        let completes = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::DeviceComplete { .. }))
            .count();
        assert_eq!(starts, 3);
        assert_eq!(completes, 3);
        assert!(events.last().unwrap().is_summary());
    }

    #[test]
    fn rediscovery_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let crawler = Crawler::new(Arc::new(lab_network()));

        let report1 = crawler
            .discover("10.0.0.1", &creds(), &options(), &layout, &NullSink)
            .unwrap();
        let inv1 = SessionsFile::load(&report1.inventory_path).unwrap();
        let topo1 = Topology::load(&report1.topology_path).unwrap();

        let report2 = crawler
            .discover("10.0.0.1", &creds(), &options(), &layout, &NullSink)
            .unwrap();
        let inv2 = SessionsFile::load(&report2.inventory_path).unwrap();
        let mut topo2 = Topology::load(&report2.topology_path).unwrap();

        assert_eq!(inv1, inv2);
        topo2.generated_at = topo1.generated_at.clone();
        assert_eq!(topo1, topo2);
    }

    #[test]
    fn failed_peer_is_reported_after_three_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let connector = lab_network();
        // sw3 refuses every connection.
        connector.add_device(
            &["10.0.0.3"],
            MockDevice::new("sw3.lab").failing_connects(99),
        );
        let crawler = Crawler::new(Arc::new(connector.clone()));

        let report = crawler
            .discover("10.0.0.1", &creds(), &options(), &layout, &NullSink)
            .unwrap();

        assert_eq!(report.device_count, 2);
        assert_eq!(report.failed_peers.len(), 1);
        assert_eq!(report.failed_peers[0].name, "sw3.lab");
        assert_eq!(connector.connect_attempts("10.0.0.3"), 3);

        // Still present in the topology from neighbor tables.
        let topology = Topology::load(&report.topology_path).unwrap();
        assert!(topology.nodes.contains_key("sw3.lab"));
        assert!(!topology.nodes["sw3.lab"].visited);
    }

    #[test]
    fn unreachable_seed_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let crawler = Crawler::new(Arc::new(MockConnector::new()));
        let err = crawler
            .discover("203.0.113.1", &creds(), &options(), &layout, &NullSink)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::SeedUnreachable { .. }));
    }

    #[test]
    fn depth_limit_stops_expansion() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let crawler = Crawler::new(Arc::new(lab_network()));
        let opts = DiscoveryOptions {
            site_name: "lab".into(),
            max_depth: Some(0),
            ..Default::default()
        };
        let report = crawler
            .discover("10.0.0.1", &creds(), &opts, &layout, &NullSink)
            .unwrap();
        // Only the seed is visited; neighbors stay topology-only.
        assert_eq!(report.device_count, 1);
        let topology = Topology::load(&report.topology_path).unwrap();
        assert_eq!(topology.nodes.len(), 3);
    }
}
