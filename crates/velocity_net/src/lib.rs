//! SSH and worker-pool primitives shared by discovery, fingerprinting and
//! collection.
//!
//! The network seam is the `DeviceConnector`/`DeviceSession` trait pair:
//! production code connects through libssh2, tests connect through the
//! mock in `velocity_testkit`. Prompt counting - not timing heuristics -
//! decides when a command sequence is complete.

pub mod cancel;
pub mod pool;
pub mod ssh;
pub mod transport;

pub use cancel::CancellationToken;
pub use pool::WorkerPool;
pub use ssh::Ssh2Connector;
pub use transport::{
    Credentials, DeviceConnector, DeviceSession, SessionOutput, SshTarget, TransportError,
};
