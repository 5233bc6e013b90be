//! # Atoll Node
//!
//! Storage-node client layer for the Atoll distributed metadata backend.
//!
//! This crate provides:
//! - **Node primitives**: Read CRDT maps and sets, apply atomic update batches
//! - **HTTP client**: One persistent client per configured storage node
//! - **In-memory node**: A full node implementation for tests
//! - **CRDT types**: Last-writer-wins registers/maps and observed-remove sets
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Metadata Backend             │
//! ├─────────────────────────────────────────┤
//! │            NodeClient Trait             │
//! ├────────────────────┬────────────────────┤
//! │   HttpNodeClient   │     MemoryNode     │
//! ├────────────────────┴────────────────────┤
//! │           CRDT Storage Nodes            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The interface is deliberately narrow (`read_map`, `read_set`, `update`)
//! so the metadata backend stays independent of the replicated-data store
//! behind each node. Field writes are only coordinated within a single
//! `update` batch, which a node applies atomically.

pub mod crdt;
pub mod error;
pub mod http;
pub mod memory;

pub use crdt::{LwwMap, LwwRegister, OrSet};
pub use error::{NodeError, Result};
pub use http::{HttpNodeClient, NodeConfig};
pub use memory::MemoryNode;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Field-name to last-writer-wins value mapping read from a CRDT map.
pub type FieldMap = HashMap<String, Value>;

/// One register or set mutation inside an atomic update batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CrdtOp {
    /// Write one register of a CRDT map
    SetRegister {
        keyspace: String,
        map: String,
        field: String,
        value: Value,
    },
    /// Remove one register from a CRDT map
    RemoveRegister {
        keyspace: String,
        map: String,
        field: String,
    },
    /// Add a member to a CRDT set
    AddElement {
        keyspace: String,
        set: String,
        member: String,
    },
    /// Remove a member from a CRDT set
    RemoveElement {
        keyspace: String,
        set: String,
        member: String,
    },
}

/// Trait for CRDT storage-node clients
///
/// Every call is a non-blocking round trip to one node; a single client must
/// support many concurrent in-flight requests.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Read a CRDT map. An absent map reads as an empty mapping.
    async fn read_map(&self, keyspace: &str, key: &str) -> Result<FieldMap>;

    /// Read a CRDT set. An absent set reads as empty.
    async fn read_set(&self, keyspace: &str, key: &str) -> Result<Vec<String>>;

    /// Apply a batch of mutations as one atomic update on this node.
    async fn update(&self, batch: Vec<CrdtOp>) -> Result<()>;

    /// Probe node reachability.
    async fn ping(&self) -> Result<()>;
}
