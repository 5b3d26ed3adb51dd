//! assetgraph-core: Shared types for the assetgraph platform.
//!
//! This crate provides the foundational types used across all assetgraph
//! components:
//! - Node and aggregation types for the versioned asset property graph
//! - Edge validity semantics (bi-temporal relationship windows)
//! - The aggregation request/result contract between tools and the engine

pub mod types;
pub mod validity;

pub use types::{
    AggregationKind, AggregationRequest, AggregationResult, AggregationValue, Direction,
    MatchMode, NodeRecord,
};
pub use validity::{is_live, EdgeValidity, ValidityFilter};
