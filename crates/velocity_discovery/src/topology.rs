//! The topology document: devices and their neighbor relationships,
//! independent of any capture.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Topology {
    /// Nodes keyed by normalized device name. BTreeMap keeps output stable
    /// so re-running discovery on an unchanged network produces an
    /// identical document (timestamps aside).
    pub nodes: BTreeMap<String, TopologyNode>,
    pub edges: Vec<TopologyEdge>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TopologyNode {
    pub ip: String,
    #[serde(default)]
    pub platform: String,
    /// Seen in neighbor tables but never reachable for a visit.
    #[serde(default)]
    pub visited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct TopologyEdge {
    pub local_device: String,
    pub local_interface: String,
    pub remote_device: String,
    pub remote_interface: String,
}

impl Topology {
    pub fn add_node(&mut self, name: &str, ip: &str, platform: &str, visited: bool) {
        let entry = self.nodes.entry(name.to_string()).or_default();
        if entry.ip.is_empty() {
            entry.ip = ip.to_string();
        }
        if entry.platform.is_empty() {
            entry.platform = platform.to_string();
        }
        entry.visited |= visited;
    }

    pub fn add_edge(&mut self, edge: TopologyEdge) {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Sort edges for stable output.
    pub fn finalize(&mut self) {
        self.edges.sort();
        self.edges.dedup();
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
