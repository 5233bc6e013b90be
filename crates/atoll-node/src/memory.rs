//! In-memory storage node for testing

use crate::crdt::{LwwMap, OrSet};
use crate::{CrdtOp, FieldMap, NodeClient, NodeError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// An in-memory CRDT node
///
/// Behaves like one storage node: maps and sets keyed by (keyspace, key),
/// update batches applied atomically under a single lock. A reachability
/// switch lets tests simulate a connection-refused node.
#[derive(Clone)]
pub struct MemoryNode {
    name: String,
    state: Arc<Mutex<NodeState>>,
    reachable: Arc<AtomicBool>,
    requests: Arc<AtomicU64>,
}

#[derive(Default)]
struct NodeState {
    maps: HashMap<(String, String), LwwMap>,
    sets: HashMap<(String, String), OrSet>,
}

impl MemoryNode {
    /// Create an empty node; `name` is its CRDT actor id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(NodeState::default())),
            reachable: Arc::new(AtomicBool::new(true)),
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Toggle reachability; an unreachable node refuses every request
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of requests this node has received (including refused ones)
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    fn admit(&self) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NodeError::Unreachable(format!(
                "{}: connection refused",
                self.name
            )))
        }
    }
}

#[async_trait]
impl NodeClient for MemoryNode {
    async fn read_map(&self, keyspace: &str, key: &str) -> Result<FieldMap> {
        self.admit()?;
        let state = self.state.lock();
        Ok(state
            .maps
            .get(&(keyspace.to_string(), key.to_string()))
            .map(LwwMap::to_field_map)
            .unwrap_or_default())
    }

    async fn read_set(&self, keyspace: &str, key: &str) -> Result<Vec<String>> {
        self.admit()?;
        let state = self.state.lock();
        Ok(state
            .sets
            .get(&(keyspace.to_string(), key.to_string()))
            .map(OrSet::members)
            .unwrap_or_default())
    }

    async fn update(&self, batch: Vec<CrdtOp>) -> Result<()> {
        self.admit()?;
        // One guard across the whole batch makes it atomic on this node
        let mut state = self.state.lock();
        for op in batch {
            match op {
                CrdtOp::SetRegister {
                    keyspace,
                    map,
                    field,
                    value,
                } => {
                    state
                        .maps
                        .entry((keyspace, map))
                        .or_insert_with(|| LwwMap::new(&self.name))
                        .set(field, value);
                }
                CrdtOp::RemoveRegister {
                    keyspace,
                    map,
                    field,
                } => {
                    if let Some(target) = state.maps.get_mut(&(keyspace, map)) {
                        target.remove(&field);
                    }
                }
                CrdtOp::AddElement {
                    keyspace,
                    set,
                    member,
                } => {
                    state
                        .sets
                        .entry((keyspace, set))
                        .or_insert_with(|| OrSet::new(&self.name))
                        .add(member);
                }
                CrdtOp::RemoveElement {
                    keyspace,
                    set,
                    member,
                } => {
                    if let Some(target) = state.sets.get_mut(&(keyspace, set)) {
                        target.remove(&member);
                    }
                }
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.admit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set_register(map: &str, field: &str, value: serde_json::Value) -> CrdtOp {
        CrdtOp::SetRegister {
            keyspace: "storage/test".to_string(),
            map: map.to_string(),
            field: field.to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn test_map_roundtrip() {
        let node = MemoryNode::new("node-0");
        node.update(vec![
            set_register("test/md", "owner", json!("alice")),
            set_register("test/md", "creationDate", json!("2026-08-07")),
        ])
        .await
        .unwrap();

        let map = node.read_map("storage/test", "test/md").await.unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("owner"), Some(&json!("alice")));
    }

    #[tokio::test]
    async fn test_absent_map_reads_empty() {
        let node = MemoryNode::new("node-0");
        let map = node.read_map("storage/ghost", "ghost/md").await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_set_add_remove() {
        let node = MemoryNode::new("node-0");
        node.update(vec![
            CrdtOp::AddElement {
                keyspace: "storage/test".to_string(),
                set: "test/objs".to_string(),
                member: "a".to_string(),
            },
            CrdtOp::AddElement {
                keyspace: "storage/test".to_string(),
                set: "test/objs".to_string(),
                member: "b".to_string(),
            },
        ])
        .await
        .unwrap();

        node.update(vec![CrdtOp::RemoveElement {
            keyspace: "storage/test".to_string(),
            set: "test/objs".to_string(),
            member: "a".to_string(),
        }])
        .await
        .unwrap();

        let members = node.read_set("storage/test", "test/objs").await.unwrap();
        assert_eq!(members, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_node_refuses_and_counts() {
        let node = MemoryNode::new("node-0");
        node.set_reachable(false);

        let err = node.read_map("storage/test", "test/md").await.unwrap_err();
        assert!(err.is_unreachable());
        assert_eq!(node.request_count(), 1);

        node.set_reachable(true);
        assert!(node.ping().await.is_ok());
    }
}
