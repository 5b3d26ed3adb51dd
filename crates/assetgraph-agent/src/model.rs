//! Conversation and model-client abstractions.
//!
//! The orchestration loop owns its conversation as a plain message list and
//! talks to the reasoning model through [`ModelClient`], so the loop can be
//! tested against a scripted client with no network involved.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use assetgraph_tools::ToolSchema;

/// One block inside a message, mirroring the wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
        }
    }

    pub fn tool_results(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: "user".to_string(),
            content: blocks,
        }
    }
}

/// One model turn, decomposed into the parts the loop cares about.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

impl ModelResponse {
    /// Concatenated text blocks of this turn.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    /// Tool-use blocks of this turn, in order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &Value)> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed model response: {0}")]
    Decode(String),
}

/// A reasoning model that can answer with text and request tool calls.
#[allow(async_fn_in_trait)]
pub trait ModelClient {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ModelResponse, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_block_wire_shape() {
        let block = ContentBlock::ToolUse {
            id: "toolu_01".to_string(),
            name: "find_node".to_string(),
            input: json!({"name": "Biofilter 11"}),
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "tool_use");
        assert_eq!(value["name"], "find_node");
    }

    #[test]
    fn test_tool_result_error_flag_omitted_when_false() {
        let ok = ContentBlock::ToolResult {
            tool_use_id: "toolu_01".to_string(),
            content: "{}".to_string(),
            is_error: false,
        };
        let value = serde_json::to_value(&ok).unwrap();
        assert!(value.get("is_error").is_none());

        let err = ContentBlock::ToolResult {
            tool_use_id: "toolu_01".to_string(),
            content: "{}".to_string(),
            is_error: true,
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["is_error"], true);
    }

    #[test]
    fn test_response_text_and_tool_uses() {
        let response = ModelResponse {
            content: vec![
                ContentBlock::Text {
                    text: "Counting now.".to_string(),
                },
                ContentBlock::ToolUse {
                    id: "toolu_01".to_string(),
                    name: "count_by_label".to_string(),
                    input: json!({"label": "Asset"}),
                },
            ],
            stop_reason: Some("tool_use".to_string()),
        };
        assert_eq!(response.text(), "Counting now.");
        let uses = response.tool_uses();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].1, "count_by_label");
    }
}
