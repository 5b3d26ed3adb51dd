//! assetgraph-agent: natural-language question answering over the asset
//! knowledge graph.
//!
//! A bounded orchestration loop pairs a reasoning model with the read-only
//! tool registry: the model selects tools, the loop executes them and folds
//! results back into the conversation until the model produces an answer or
//! the iteration bound forces one.

pub mod anthropic;
pub mod model;
pub mod orchestrator;

pub use anthropic::{AnthropicClient, ModelConfig};
pub use model::{ContentBlock, Message, ModelClient, ModelError, ModelResponse};
pub use orchestrator::{AgentError, AgentLoop, ChatOutcome, LoopConfig, ToolCallRecord};
