//! Node pool: one client per configured storage node, plus the failure
//! handler that evicts unreachable nodes from the hash ring

use crate::config::ClusterConfig;
use crate::error::{MetaError, Result};
use crate::ring::HashRing;
use crate::{is_reserved_bucket, NodeId, DESIGNATED_NODE};
use atoll_node::{CrdtOp, FieldMap, HttpNodeClient, NodeClient, NodeConfig, NodeError};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

struct NodeHandle {
    address: String,
    client: Arc<dyn NodeClient>,
}

/// The pool of storage-node clients and the ring that routes to them.
///
/// Eviction mutates ring topology only: the pool slot and its client stay,
/// so an operator can readmit the node later. Routing is computed fresh per
/// call; in-flight calls against an evicted node fail to their callers
/// without retry or rerouting.
pub struct NodePool {
    nodes: Vec<NodeHandle>,
    ring: RwLock<HashRing>,
}

impl NodePool {
    /// Connect to every configured node and register the reachable ones
    /// into the hash ring.
    pub async fn connect(config: &ClusterConfig) -> Result<Self> {
        let mut nodes = Vec::with_capacity(config.nodes.len());
        for addr in &config.nodes {
            let mut node_config = NodeConfig::new(addr.host.clone(), addr.port);
            node_config.timeout = config.request_timeout();
            let client = HttpNodeClient::new(node_config).map_err(MetaError::Node)?;
            nodes.push(NodeHandle {
                address: addr.to_string(),
                client: Arc::new(client),
            });
        }

        let pool = Self {
            nodes,
            ring: RwLock::new(HashRing::new(config.virtual_replicas)),
        };

        for (index, handle) in pool.nodes.iter().enumerate() {
            let node = NodeId(index);
            match handle.client.ping().await {
                Ok(()) => {
                    pool.ring.write().add_node(node, &handle.address);
                    info!(%node, address = %handle.address, "registered storage node");
                }
                Err(err) => {
                    warn!(%node, address = %handle.address, %err, "storage node unreachable at startup");
                }
            }
        }

        Ok(pool)
    }

    /// Build a pool over externally supplied clients, all registered into
    /// the ring. Used by tests and alternate transports.
    pub fn from_clients(clients: Vec<Arc<dyn NodeClient>>, virtual_replicas: u16) -> Self {
        let mut ring = HashRing::new(virtual_replicas);
        let nodes: Vec<NodeHandle> = clients
            .into_iter()
            .enumerate()
            .map(|(index, client)| NodeHandle {
                address: format!("node-{index}"),
                client,
            })
            .collect();
        for index in 0..nodes.len() {
            ring.add_node(NodeId(index), &nodes[index].address);
        }
        Self {
            nodes,
            ring: RwLock::new(ring),
        }
    }

    /// Pick the node owning a bucket.
    ///
    /// The reserved buckets always resolve to the designated node; every
    /// other name routes through the ring. The result is a per-call value,
    /// never cached across calls.
    pub fn route(&self, bucket: &str) -> Result<NodeId> {
        if is_reserved_bucket(bucket) {
            return Ok(DESIGNATED_NODE);
        }
        self.ring
            .read()
            .route(bucket)
            .ok_or(MetaError::NoNodesAvailable)
    }

    /// Read a CRDT map on `node`
    pub async fn read_map(&self, node: NodeId, keyspace: &str, key: &str) -> Result<FieldMap> {
        let handle = self.handle(node)?;
        handle
            .client
            .read_map(keyspace, key)
            .await
            .map_err(|err| self.classify(node, err))
    }

    /// Read a CRDT set on `node`
    pub async fn read_set(&self, node: NodeId, keyspace: &str, key: &str) -> Result<Vec<String>> {
        let handle = self.handle(node)?;
        handle
            .client
            .read_set(keyspace, key)
            .await
            .map_err(|err| self.classify(node, err))
    }

    /// Apply an atomic update batch on `node`
    pub async fn update(&self, node: NodeId, batch: Vec<CrdtOp>) -> Result<()> {
        let handle = self.handle(node)?;
        handle
            .client
            .update(batch)
            .await
            .map_err(|err| self.classify(node, err))
    }

    /// Remove a node from the ring; its pool slot survives for manual
    /// readmission. Evicting an absent node is a no-op.
    pub fn evict(&self, node: NodeId) {
        let mut ring = self.ring.write();
        if ring.contains(node) {
            ring.remove_node(node);
            warn!(%node, "evicted unreachable node from hash ring");
        }
    }

    /// Manually re-add a previously evicted node to the ring
    pub fn readmit(&self, node: NodeId) -> Result<()> {
        let handle = self.handle(node)?;
        self.ring.write().add_node(node, &handle.address);
        info!(%node, "readmitted node to hash ring");
        Ok(())
    }

    /// Whether a node is currently on the ring
    pub fn in_ring(&self, node: NodeId) -> bool {
        self.ring.read().contains(node)
    }

    /// Number of configured nodes (on the ring or not)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no node is configured
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn handle(&self, node: NodeId) -> Result<&NodeHandle> {
        self.nodes
            .get(node.0)
            .ok_or_else(|| MetaError::Node(NodeError::Api(format!("unknown node id {node}"))))
    }

    /// Failure handler: the connection-refused class evicts the node and
    /// still resolves the in-flight caller with a typed error.
    fn classify(&self, node: NodeId, err: NodeError) -> MetaError {
        if err.is_unreachable() {
            self.evict(node);
            MetaError::NodeUnreachable {
                node: node.0,
                detail: err.to_string(),
            }
        } else {
            MetaError::Node(err)
        }
    }
}
