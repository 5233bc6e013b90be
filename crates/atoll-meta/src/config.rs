//! Metadata-cluster configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Address of one storage node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddr {
    /// Node host
    pub host: String,
    /// Node API port
    pub port: u16,
}

impl NodeAddr {
    /// Create a node address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Metadata-cluster configuration, read once at startup
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Ordered storage-node addresses; a node's position is its id
    pub nodes: Vec<NodeAddr>,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Virtual replicas per physical node on the hash ring
    pub virtual_replicas: u16,
    /// Concurrent per-key metadata fetches during a listing
    pub list_concurrency: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: vec![NodeAddr::new("127.0.0.1", 8087)],
            request_timeout_secs: 30,
            virtual_replicas: 40,
            list_concurrency: 16,
        }
    }
}

impl ClusterConfig {
    /// The per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
