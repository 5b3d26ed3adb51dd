//! assetgraph-graph: Neo4j access layer for the asset knowledge graph.
//!
//! Every read goes through a small fixed set of parameterized Cypher
//! templates; caller-controlled strings are always bound as query
//! parameters, never interpolated into query text. Writes are limited to
//! the single-node property-edit path in `mutations`.

pub mod client;
pub mod mutations;
pub mod resolve;
pub mod rows;
pub mod schema;
pub mod traverse;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use mutations::PropertyUpdate;
pub use resolve::{ConnectionRecord, ResolveSpec};
pub use schema::GraphSchema;
