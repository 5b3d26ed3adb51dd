//! Tool-boundary error taxonomy.
//!
//! `NotFound` is deliberately absent: a resolver that matches nothing is a
//! successful call returning `found: false`, not an error.

use assetgraph_graph::GraphError;
use serde::Serialize;

/// Classifies a tool failure for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Bad label, relationship type, aggregation, or argument shape.
    /// Always reported, never retried.
    Validation,
    /// Store connection failure or timeout. Eligible for caller-level
    /// retry; never silently swallowed.
    StoreUnavailable,
    /// Malformed tool-call arguments from the reasoning model; folded back
    /// into the conversation so the model can self-correct.
    ModelProtocol,
    Internal,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::Validation => "validation",
            ToolErrorKind::StoreUnavailable => "store_unavailable",
            ToolErrorKind::ModelProtocol => "model_protocol",
            ToolErrorKind::Internal => "internal",
        }
    }
}

/// A structured tool error, serializable across the tool boundary.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{} error: {message}", kind.as_str())]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn model_protocol(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::ModelProtocol,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::Internal,
            message: message.into(),
        }
    }

    /// The JSON payload folded into a conversation as a tool result.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "kind": self.kind.as_str(),
                "message": self.message,
            }
        })
    }
}

impl From<GraphError> for ToolError {
    fn from(e: GraphError) -> Self {
        let kind = match &e {
            GraphError::Connection(_) | GraphError::Query(_) | GraphError::Timeout(_) => {
                ToolErrorKind::StoreUnavailable
            }
            GraphError::UnsupportedValue { .. } | GraphError::NodeNotFound { .. } => {
                ToolErrorKind::Validation
            }
            GraphError::Serialization(_) => ToolErrorKind::Internal,
        };
        Self {
            kind,
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_payload_shape() {
        let err = ToolError::validation("label must be one of [Asset, Location]");
        let value = err.to_value();
        assert_eq!(value["error"]["kind"], "validation");
        assert!(value["error"]["message"]
            .as_str()
            .unwrap()
            .contains("label"));
    }

    #[test]
    fn test_graph_error_classification() {
        let timeout = GraphError::Timeout(std::time::Duration::from_secs(15));
        assert_eq!(ToolError::from(timeout).kind, ToolErrorKind::StoreUnavailable);

        let bad_key = GraphError::UnsupportedValue {
            key: "x".to_string(),
            reason: "nope".to_string(),
        };
        assert_eq!(ToolError::from(bad_key).kind, ToolErrorKind::Validation);
    }
}
