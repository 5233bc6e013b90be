//! Error types for the atoll-node crate

use thiserror::Error;

/// Result type alias using `NodeError`
pub type Result<T> = std::result::Result<T, NodeError>;

/// Errors that can occur talking to a single storage node
#[derive(Error, Debug)]
pub enum NodeError {
    /// Node refused or dropped the connection
    #[error("node unreachable: {0}")]
    Unreachable(String),

    /// Request timed out
    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Node API returned an error response
    #[error("node API error: {0}")]
    Api(String),

    /// HTTP transport error
    #[error("http error: {0}")]
    Http(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl NodeError {
    /// True for the connection-refused class of failures that triggers
    /// ring eviction.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, NodeError::Unreachable(_))
    }
}

impl From<reqwest::Error> for NodeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NodeError::Timeout { seconds: 30 }
        } else if err.is_connect() {
            NodeError::Unreachable(err.to_string())
        } else {
            NodeError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(err: serde_json::Error) -> Self {
        NodeError::Serialization(err.to_string())
    }
}
