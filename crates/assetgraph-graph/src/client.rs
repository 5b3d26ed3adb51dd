//! Neo4j connection management and shared graph client.

use std::time::Duration;

use neo4rs::{ConfigBuilder, Graph, Query};

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error("unsupported property value for key {key}: {reason}")]
    UnsupportedValue { key: String, reason: String },

    #[error("node not found: {node_id}")]
    NodeNotFound { node_id: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
    /// Per-query timeout; a timed-out call is reported, not retried.
    pub query_timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "assetgraph-dev".to_string(),
            max_connections: 16,
            fetch_size: 256,
            query_timeout_secs: 15,
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// The single point of access for all knowledge graph operations. Each
/// query acquires a pooled connection for its own duration; nothing is
/// held across calls. Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
    query_timeout: Duration,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self {
            graph,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
        })
    }

    /// Execute a write query (SET/REMOVE on the property-edit path).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        tokio::time::timeout(self.query_timeout, self.graph.run(query))
            .await
            .map_err(|_| GraphError::Timeout(self.query_timeout))??;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let rows = tokio::time::timeout(self.query_timeout, async {
            let mut stream = self.graph.execute(query).await?;
            let mut rows = Vec::new();
            while let Some(row) = stream.next().await? {
                rows.push(row);
            }
            Ok::<_, neo4rs::Error>(rows)
        })
        .await
        .map_err(|_| GraphError::Timeout(self.query_timeout))??;
        Ok(rows)
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, GraphError> {
        let row = tokio::time::timeout(self.query_timeout, async {
            let mut stream = self.graph.execute(query).await?;
            stream.next().await
        })
        .await
        .map_err(|_| GraphError::Timeout(self.query_timeout))??;
        Ok(row)
    }
}
