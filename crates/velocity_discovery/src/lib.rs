//! Discovery crawler: BFS over CDP/LLDP neighbors from a seed device.
//!
//! Produces the two discovery artifacts the rest of the pipeline consumes:
//! the sessions inventory (`discovery/sessions.yaml`) and the topology
//! document (`discovery/network.json`). The crawler is stateless across
//! runs; re-crawling an unchanged network yields the same device set and
//! edges.

pub mod crawler;
pub mod neighbors;
pub mod topology;

pub use crawler::{Crawler, DiscoveryError, DiscoveryOptions, DiscoveryReport, FailedPeer};
pub use neighbors::{NeighborRecord, NeighborSource};
pub use velocity_protocol::inventory::{InventoryFolder, InventorySession, SessionsFile};
pub use topology::{Topology, TopologyEdge, TopologyNode};
