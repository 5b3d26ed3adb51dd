//! assetgraph-tools: the tool boundary over the asset knowledge graph.
//!
//! A closed set of named, schema-described operations exposed uniformly to
//! the orchestration loop and to any direct caller. `Registry::invoke` is
//! the single choke point: every inbound argument passes the parameter
//! validator before a query is built, and store failures come back as
//! structured error payloads rather than crashes.

pub mod error;
pub mod registry;
pub mod schemas;
pub mod validate;

pub use error::{ToolError, ToolErrorKind};
pub use registry::{Registry, RegistryConfig, ToolCall, ToolDispatch};
pub use schemas::ToolSchema;
pub use validate::{SchemaCache, ToolLimits};
