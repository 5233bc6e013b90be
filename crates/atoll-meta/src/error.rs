//! Error types for the atoll-meta crate

use atoll_node::NodeError;
use thiserror::Error;

/// Result type alias using `MetaError`
pub type Result<T> = std::result::Result<T, MetaError>;

/// Errors reported by metadata-backend operations
///
/// Nothing here is fatal to the process: every failure is per-operation and
/// resolves the caller exactly once.
#[derive(Error, Debug)]
pub enum MetaError {
    /// Bucket does not exist
    #[error("no such bucket: {0}")]
    NoSuchBucket(String),

    /// Bucket already exists
    #[error("bucket already exists: {0}")]
    BucketAlreadyExists(String),

    /// Bucket still holds objects
    #[error("bucket not empty: {0}")]
    BucketNotEmpty(String),

    /// Object does not exist
    #[error("no such key: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    /// Invalid request argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The routed node is unreachable; it has been evicted from the ring
    #[error("storage node {node} unreachable: {detail}")]
    NodeUnreachable { node: usize, detail: String },

    /// No node left in the ring to route to
    #[error("no storage nodes available")]
    NoNodesAvailable,

    /// Other storage-node failure
    #[error("node error: {0}")]
    Node(#[from] NodeError),
}
