//! HTTP API client for a single CRDT storage node

use crate::{CrdtOp, FieldMap, NodeClient, NodeError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// Configuration for one storage-node connection
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Node host
    pub host: String,
    /// Node API port
    pub port: u16,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8087,
            timeout: Duration::from_secs(30),
        }
    }
}

impl NodeConfig {
    /// Create a config for the given address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// The node's `host:port` address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP client for one storage node
///
/// The underlying connection is shared by every bucket routed to this node
/// and multiplexes concurrent requests.
#[derive(Clone)]
pub struct HttpNodeClient {
    client: Client,
    config: NodeConfig,
}

impl HttpNodeClient {
    /// Create a client for one node
    pub fn new(config: NodeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NodeError::Http(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// The node's `host:port` address
    pub fn address(&self) -> String {
        self.config.address()
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.config.host, self.config.port, path)
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    #[instrument(skip(self), fields(node = %self.address()))]
    async fn read_map(&self, keyspace: &str, key: &str) -> Result<FieldMap> {
        let response = self
            .client
            .get(self.url("/v1/map"))
            .query(&[("keyspace", keyspace), ("key", key)])
            .send()
            .await?;

        // An unknown map reads as empty
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(FieldMap::new());
        }

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(NodeError::Api(format!("failed to read map: {}", error)));
        }

        let payload: MapPayload = response
            .json()
            .await
            .map_err(|e| NodeError::Api(e.to_string()))?;
        Ok(payload.entries)
    }

    #[instrument(skip(self), fields(node = %self.address()))]
    async fn read_set(&self, keyspace: &str, key: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.url("/v1/set"))
            .query(&[("keyspace", keyspace), ("key", key)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(NodeError::Api(format!("failed to read set: {}", error)));
        }

        let payload: SetPayload = response
            .json()
            .await
            .map_err(|e| NodeError::Api(e.to_string()))?;
        Ok(payload.members)
    }

    #[instrument(skip(self, batch), fields(node = %self.address(), ops = batch.len()))]
    async fn update(&self, batch: Vec<CrdtOp>) -> Result<()> {
        let response = self
            .client
            .post(self.url("/v1/update"))
            .json(&UpdatePayload { ops: batch })
            .send()
            .await?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(NodeError::Api(format!("update rejected: {}", error)));
        }

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let response = self.client.get(self.url("/v1/ping")).send().await?;

        if !response.status().is_success() {
            return Err(NodeError::Api(format!(
                "ping failed with status {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct MapPayload {
    #[serde(default)]
    entries: FieldMap,
}

#[derive(Debug, Deserialize)]
struct SetPayload {
    #[serde(default)]
    members: Vec<String>,
}

#[derive(Debug, Serialize)]
struct UpdatePayload {
    ops: Vec<CrdtOp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = NodeConfig::default();
        assert_eq!(config.address(), "127.0.0.1:8087");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_new() {
        let config = NodeConfig::new("node-3.internal", 9001);
        assert_eq!(config.address(), "node-3.internal:9001");
    }
}
