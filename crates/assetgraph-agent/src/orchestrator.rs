//! The bounded tool-orchestration loop.
//!
//! One question in, one answer out. The loop owns its conversation as an
//! explicit message list, dispatches requested tool calls through
//! [`ToolDispatch`], folds every result (including failures) back into the
//! conversation, and gives up after a fixed number of iterations with a
//! best-effort summary instead of hanging.

use futures::future::join_all;
use serde_json::Value;

use assetgraph_tools::ToolDispatch;

use crate::model::{ContentBlock, Message, ModelClient, ModelError};

const SYSTEM_PROMPT: &str = "\
You are an assistant that answers questions about an asset knowledge graph.

Your job:
1. Analyze the user's question.
2. Select the appropriate tool(s) and call them with correct arguments.
3. If a tool returns found:false or an error, try a different approach \
(e.g. match_mode=\"prefix\" instead of \"exact\", different relationship \
types, or get_schema to see what exists).
4. Once you have results, summarize them in clear natural language.

Guidelines:
- For \"how many assets in X\" or \"items in X\", use aggregate_related_by_name \
with relationship_types=[\"LOCATED_IN\"], target_label=\"Asset\".
- For generic or plural names (\"biofilters\", \"halls\"), use \
name_match=\"prefix\" with the base name (\"Biofilter\", \"Hall\"). Exact match \
only finds one node with that exact name.
- Pass array parameters as actual arrays, not JSON strings.
- For \"where is X\", find the node and use describe_node_connections to see \
its containment, or read the location from its fingerprint.
- Use get_schema when you need to see which labels or relationship types \
exist.
- Only give a final answer once you have results. If every attempt fails, \
explain what you tried.
- Do NOT reply with only planning text like \"Let me check...\". Call the \
tools first, then answer.";

const CONTINUE_PROMPT: &str = "Continue. Call the appropriate tool(s) to \
answer the question, then provide your final answer. Do not output only \
planning or partial responses.";

/// Loop bounds.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Maximum model turns that may request tools before the loop is forced
    /// to answer with whatever it has.
    pub max_iterations: usize,
    /// Truncate the final answer to this many characters (None = no cap).
    pub max_answer_chars: Option<usize>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_answer_chars: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("question cannot be empty")]
    EmptyQuestion,
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// One executed tool call, kept for the caller's audit trail.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub input: Value,
    pub output: Value,
    pub is_error: bool,
}

/// Outcome of one question.
#[derive(Debug, serde::Serialize)]
pub struct ChatOutcome {
    pub answer: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub iterations: usize,
    /// True when the iteration bound was hit and the answer is a forced
    /// summary rather than a natural completion.
    pub exhausted: bool,
}

pub struct AgentLoop<M, T> {
    model: M,
    tools: T,
    config: LoopConfig,
}

impl<M: ModelClient, T: ToolDispatch> AgentLoop<M, T> {
    pub fn new(model: M, tools: T, config: LoopConfig) -> Self {
        Self {
            model,
            tools,
            config,
        }
    }

    /// Answer one natural-language question.
    pub async fn run(&self, question: &str) -> Result<ChatOutcome, AgentError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AgentError::EmptyQuestion);
        }

        let schemas = self.tools.tool_schemas();
        let mut conversation = vec![Message::user_text(question)];
        let mut records: Vec<ToolCallRecord> = Vec::new();
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            iterations += 1;
            let response = self
                .model
                .complete(SYSTEM_PROMPT, &conversation, &schemas)
                .await?;

            let uses: Vec<(String, String, Value)> = response
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();

            if uses.is_empty() {
                let text = response.text();
                if text.is_empty() {
                    break;
                }
                // Planning text before any tool has run gets bounced back
                // instead of being served to the user as an answer.
                if records.is_empty() && is_planning_text(&text) {
                    tracing::debug!(iteration = iterations, "bounced planning-only response");
                    conversation.push(Message::assistant(response.content));
                    conversation.push(Message::user_text(CONTINUE_PROMPT));
                    continue;
                }
                return Ok(ChatOutcome {
                    answer: self.truncate(text),
                    tool_calls: records,
                    iterations,
                    exhausted: false,
                });
            }

            conversation.push(Message::assistant(response.content.clone()));

            // Sibling tool calls from one turn run concurrently; each failure
            // is folded back as an error result, never a crash.
            let results = join_all(uses.iter().map(|(_, name, input)| {
                let input = input.clone();
                async move { self.tools.dispatch(name, input).await }
            }))
            .await;

            let mut result_blocks = Vec::with_capacity(uses.len());
            for ((id, name, input), result) in uses.into_iter().zip(results) {
                let (output, is_error) = match result {
                    Ok(value) => (value, false),
                    Err(e) => {
                        tracing::warn!(tool = %name, error = %e, "tool call failed");
                        (e.to_value(), true)
                    }
                };
                result_blocks.push(ContentBlock::ToolResult {
                    tool_use_id: id,
                    content: output.to_string(),
                    is_error,
                });
                records.push(ToolCallRecord {
                    name,
                    input,
                    output,
                    is_error,
                });
            }
            conversation.push(Message::tool_results(result_blocks));
        }

        // Bound hit. One last completion without tools forces a summary of
        // whatever was gathered.
        tracing::warn!(
            iterations,
            tool_calls = records.len(),
            "iteration bound reached, forcing final answer"
        );
        let answer = match self.model.complete(SYSTEM_PROMPT, &conversation, &[]).await {
            Ok(response) => {
                let text = response.text();
                if text.is_empty() {
                    fallback_answer(&records)
                } else {
                    text
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "final completion failed");
                fallback_answer(&records)
            }
        };

        Ok(ChatOutcome {
            answer: self.truncate(answer),
            tool_calls: records,
            iterations,
            exhausted: true,
        })
    }

    fn truncate(&self, answer: String) -> String {
        let Some(max) = self.config.max_answer_chars else {
            return answer;
        };
        if answer.chars().count() <= max {
            return answer;
        }
        let mut out: String = answer.chars().take(max).collect();
        out.push_str("...");
        out
    }
}

/// Heuristic match for "I'm about to do something" text that carries no
/// answer.
fn is_planning_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    const PHRASES: &[&str] = &[
        "let me check",
        "let me look",
        "let me find",
        "let me examine",
        "let me see",
        "let me get",
        "now let me",
        "i'll check",
        "i'll look",
        "i'll find",
        "i'll examine",
        "i will check",
        "i will look",
        "examining their connections",
    ];
    PHRASES.iter().any(|p| lower.contains(p))
}

fn fallback_answer(records: &[ToolCallRecord]) -> String {
    format!(
        "I tried {} tool call(s) but couldn't find the requested information.",
        records.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde_json::json;

    use crate::model::{ModelResponse, ModelClient};
    use assetgraph_tools::{ToolError, ToolSchema};

    struct ScriptedModel {
        turns: Mutex<Vec<ModelResponse>>,
    }

    impl ScriptedModel {
        fn new(turns: Vec<ModelResponse>) -> Self {
            Self {
                turns: Mutex::new(turns),
            }
        }
    }

    impl ModelClient for ScriptedModel {
        async fn complete(
            &self,
            _system: &str,
            _messages: &[Message],
            _tools: &[ToolSchema],
        ) -> Result<ModelResponse, ModelError> {
            let mut turns = self.turns.lock().unwrap();
            if turns.is_empty() {
                return Ok(text_turn("out of script"));
            }
            Ok(turns.remove(0))
        }
    }

    struct StubTools {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl StubTools {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl ToolDispatch for StubTools {
        fn tool_schemas(&self) -> Vec<ToolSchema> {
            Vec::new()
        }

        async fn dispatch(&self, name: &str, _input: Value) -> Result<Value, ToolError> {
            self.calls.lock().unwrap().push(name.to_string());
            if self.fail {
                Err(ToolError::validation("label must be one of [Asset]"))
            } else {
                Ok(json!({"found": true, "total_count": 7}))
            }
        }
    }

    fn text_turn(text: &str) -> ModelResponse {
        ModelResponse {
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
            stop_reason: Some("end_turn".to_string()),
        }
    }

    fn tool_turn(id: &str, name: &str, input: Value) -> ModelResponse {
        ModelResponse {
            content: vec![ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            }],
            stop_reason: Some("tool_use".to_string()),
        }
    }

    fn agent(turns: Vec<ModelResponse>, fail: bool) -> AgentLoop<ScriptedModel, StubTools> {
        AgentLoop::new(
            ScriptedModel::new(turns),
            StubTools::new(fail),
            LoopConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_direct_text_answer() {
        let agent = agent(vec![text_turn("There are 7 assets.")], false);
        let outcome = agent.run("How many assets?").await.unwrap();
        assert_eq!(outcome.answer, "There are 7 assets.");
        assert!(outcome.tool_calls.is_empty());
        assert!(!outcome.exhausted);
        assert_eq!(outcome.iterations, 1);
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let agent = agent(
            vec![
                tool_turn("toolu_01", "count_by_label", json!({"label": "Asset"})),
                text_turn("There are 7 assets."),
            ],
            false,
        );
        let outcome = agent.run("How many assets?").await.unwrap();
        assert_eq!(outcome.answer, "There are 7 assets.");
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].name, "count_by_label");
        assert!(!outcome.tool_calls[0].is_error);
        assert_eq!(outcome.iterations, 2);
    }

    #[tokio::test]
    async fn test_tool_failure_folded_back_not_fatal() {
        let agent = agent(
            vec![
                tool_turn("toolu_01", "count_by_label", json!({"label": "Nope"})),
                text_turn("That label does not exist in the graph."),
            ],
            true,
        );
        let outcome = agent.run("How many Nopes?").await.unwrap();
        assert_eq!(outcome.tool_calls.len(), 1);
        assert!(outcome.tool_calls[0].is_error);
        assert_eq!(outcome.tool_calls[0].output["error"]["kind"], "validation");
        assert_eq!(outcome.answer, "That label does not exist in the graph.");
    }

    #[tokio::test]
    async fn test_planning_text_bounced_before_tools_ran() {
        let agent = agent(
            vec![
                text_turn("Let me check the asset counts for you."),
                tool_turn("toolu_01", "count_by_label", json!({"label": "Asset"})),
                text_turn("There are 7 assets."),
            ],
            false,
        );
        let outcome = agent.run("How many assets?").await.unwrap();
        assert_eq!(outcome.answer, "There are 7 assets.");
        assert_eq!(outcome.tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn test_planning_text_accepted_after_tools_ran() {
        // Once tool results exist, text that happens to contain a planning
        // phrase is still a final answer.
        let agent = agent(
            vec![
                tool_turn("toolu_01", "count_by_label", json!({"label": "Asset"})),
                text_turn("I'll check back later, but the count today is 7."),
            ],
            false,
        );
        let outcome = agent.run("How many assets?").await.unwrap();
        assert!(outcome.answer.contains("7"));
        assert!(!outcome.exhausted);
    }

    #[tokio::test]
    async fn test_iteration_bound_forces_summary() {
        let turns: Vec<ModelResponse> = (0..5)
            .map(|i| tool_turn(&format!("toolu_{i}"), "get_schema", json!({})))
            .chain(std::iter::once(text_turn(
                "After several lookups: 7 assets.",
            )))
            .collect();
        let agent = agent(turns, false);
        let outcome = agent.run("How many assets?").await.unwrap();
        assert!(outcome.exhausted);
        assert_eq!(outcome.iterations, 5);
        assert_eq!(outcome.tool_calls.len(), 5);
        assert_eq!(outcome.answer, "After several lookups: 7 assets.");
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let agent = agent(vec![], false);
        let err = agent.run("   ").await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyQuestion));
    }

    #[tokio::test]
    async fn test_answer_truncation() {
        let mut config = LoopConfig::default();
        config.max_answer_chars = Some(10);
        let agent = AgentLoop::new(
            ScriptedModel::new(vec![text_turn("A very long answer about assets.")]),
            StubTools::new(false),
            config,
        );
        let outcome = agent.run("How many assets?").await.unwrap();
        assert_eq!(outcome.answer, "A very lon...");
    }

    #[test]
    fn test_planning_detection() {
        assert!(is_planning_text("Let me check the counts."));
        assert!(is_planning_text("Now let me look at connections."));
        assert!(!is_planning_text("There are 7 assets in Hall 1."));
    }
}
