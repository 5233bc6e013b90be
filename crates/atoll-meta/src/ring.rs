//! Consistent hashing ring mapping bucket names to storage nodes

use crate::NodeId;
use md5::{Digest, Md5};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Consistent-hash ring over the 128-bit MD5 space.
///
/// Each physical node owns `virtual_replicas` positions so load spreads
/// evenly. A key routes to the owner of the first position at or after the
/// key's own position, wrapping at the top of the space. Topology changes
/// remap only the keys owned by the affected node.
#[derive(Debug, Clone)]
pub struct HashRing {
    /// Ring position -> physical node
    positions: BTreeMap<u128, NodeId>,
    /// Per-node label the positions were derived from
    nodes: HashMap<NodeId, String>,
    virtual_replicas: u16,
}

impl HashRing {
    /// Create an empty ring
    pub fn new(virtual_replicas: u16) -> Self {
        Self {
            positions: BTreeMap::new(),
            nodes: HashMap::new(),
            virtual_replicas,
        }
    }

    /// Add a node under the given label (its `host:port` address).
    ///
    /// Re-adding a present node refreshes its positions.
    pub fn add_node(&mut self, node: NodeId, label: &str) {
        self.remove_node(node);

        for replica in 0..self.virtual_replicas {
            self.positions
                .insert(position(&format!("{label}#{replica}")), node);
        }
        self.nodes.insert(node, label.to_string());
        debug!(%node, label, "added node to hash ring");
    }

    /// Remove a node. Removing an absent node is a no-op.
    pub fn remove_node(&mut self, node: NodeId) {
        if let Some(label) = self.nodes.remove(&node) {
            for replica in 0..self.virtual_replicas {
                self.positions.remove(&position(&format!("{label}#{replica}")));
            }
            debug!(%node, "removed node from hash ring");
        }
    }

    /// Route a key to its owning node; `None` on an empty ring.
    ///
    /// Deterministic for a fixed topology.
    pub fn route(&self, key: &str) -> Option<NodeId> {
        if self.positions.is_empty() {
            return None;
        }

        let pos = position(key);
        self.positions
            .range(pos..)
            .next()
            .or_else(|| self.positions.iter().next())
            .map(|(_, node)| *node)
    }

    /// Whether a node is currently on the ring
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Number of physical nodes on the ring
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when no node is on the ring
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A key's position on the ring: its MD5 digest as a 128-bit integer
fn position(key: &str) -> u128 {
    let digest: [u8; 16] = Md5::digest(key.as_bytes()).into();
    u128::from_be_bytes(digest)
}
