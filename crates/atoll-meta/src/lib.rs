//! # Atoll Meta
//!
//! Distributed metadata backend for the Atoll S3-compatible gateway.
//!
//! This crate provides:
//! - **Hash Ring**: Consistent hashing from bucket names to storage nodes
//! - **Node Pool**: One client per storage node, with failure-triggered
//!   ring eviction
//! - **Metadata Store**: Bucket/object CRUD over CRDT maps and sets
//! - **Listing Engine**: Paginated, prefix/delimiter-aware object listings
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           S3 API Layer (external)       │
//! ├─────────────────────────────────────────┤
//! │      MetadataBackend / Listing Engine   │
//! ├─────────────────────────────────────────┤
//! │        Hash Ring    │    Node Pool      │
//! ├─────────────────────┴───────────────────┤
//! │        CRDT Storage Nodes (atoll-node)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Every operation hashes its bucket name to pick an owning node, reads and
//! writes that bucket's CRDT state there, and reports node failures both to
//! the caller (typed error) and to the ring (eviction). Two reserved bucket
//! names carry cluster-wide state and bypass the ring entirely.

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod listing;
pub mod multipart;
pub mod pool;
pub mod ring;
pub mod store;

pub use backend::{BucketAndObject, MetadataBackend};
pub use config::{ClusterConfig, NodeAddr};
pub use context::RequestContext;
pub use error::{MetaError, Result};
pub use listing::{ListObjectsParams, ListObjectsResult, ListedObject};
pub use multipart::{MultipartListing, MultipartListingParams, MultipartUpload, MultipartUploadLister};
pub use pool::NodePool;
pub use ring::HashRing;
pub use store::CrdtMetadataStore;

use std::fmt;

/// Ordinal identifier of a storage node in the pool
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Reserved bucket holding the per-account state of the whole cluster
pub const USERS_BUCKET: &str = "users..bucket";

/// Reserved bucket holding the global namespace map
pub const NAMESPACE_BUCKET: &str = "namespaceusersbucket";

/// Node that always owns the reserved buckets
pub const DESIGNATED_NODE: NodeId = NodeId(0);

/// True for the bucket names that carry cluster-wide state and bypass
/// hash routing.
pub fn is_reserved_bucket(name: &str) -> bool {
    name == USERS_BUCKET || name == NAMESPACE_BUCKET
}
