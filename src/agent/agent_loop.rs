//! Core agent loop implementation.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::Config;
use crate::llm::{LlmClient, LlmError, OpenAiClient};
use crate::tools::{TavilyClient, ToolRegistry};

use super::events::{AgentEvent, EventSink};
use super::prompt::build_system_prompt;
use super::transcript::{Transcript, Turn};

/// Final result of one user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    /// Text to hand to the presenter, fenced code blocks intact.
    pub text: String,
    /// Model rounds used for this turn.
    pub rounds: usize,
    /// Whether the round cap cut the turn short.
    pub round_limit_hit: bool,
}

/// The chat agent: a model client, the tool registry, and the loop tying them together.
pub struct Agent {
    config: Config,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    system_prompt: String,
}

impl Agent {
    /// Create an agent talking to the configured model and search endpoints.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let llm = Arc::new(OpenAiClient::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.request_timeout,
        )?);
        let search = Arc::new(TavilyClient::new(
            config.tavily_api_key.clone(),
            config.tavily_base_url.clone(),
            config.request_timeout,
        )?);
        let tools = ToolRegistry::builtin(search)?;

        Ok(Self::with_components(config, llm, tools))
    }

    /// Create an agent from already-built parts.
    pub fn with_components(config: Config, llm: Arc<dyn LlmClient>, tools: ToolRegistry) -> Self {
        let workspace_str = config.workspace_path.to_string_lossy().to_string();
        let system_prompt = build_system_prompt(&workspace_str, &tools);

        Self {
            config,
            llm,
            tools,
            system_prompt,
        }
    }

    /// Process one user message until the model answers without tool calls.
    ///
    /// Turns are staged and only committed to `transcript` when the turn
    /// finishes. A model transport failure returns the error and leaves the
    /// transcript exactly as it was.
    pub async fn run_turn(
        &self,
        transcript: &mut Transcript,
        user_input: &str,
        events: &dyn EventSink,
    ) -> Result<TurnReply, LlmError> {
        let mut pending = transcript.begin_turn();
        pending.push(Turn::UserText {
            content: user_input.to_string(),
        });

        let tool_schemas = self.tools.get_tool_schemas();
        let max_rounds = self.config.max_rounds;

        for round in 1..=max_rounds {
            tracing::debug!("Agent round {}/{}", round, max_rounds);
            debug_assert!(pending.unresolved_requests().is_empty());

            let messages = pending.to_messages(&self.system_prompt);
            let response = self
                .llm
                .chat_completion(&self.config.default_model, &messages, Some(&tool_schemas))
                .await
                .map_err(|e| {
                    tracing::error!("Model call failed in round {}: {}", round, e);
                    e
                })?;

            let text = response.combined_text();
            let mut tool_calls = response.into_tool_calls();

            if !text.is_empty() {
                pending.push(Turn::AssistantText {
                    content: text.clone(),
                });
                events.emit(AgentEvent::AssistantText {
                    content: text.clone(),
                });
            }

            if tool_calls.is_empty() {
                pending.commit();
                return Ok(TurnReply {
                    text,
                    rounds: round,
                    round_limit_hit: false,
                });
            }

            for tool_call in &mut tool_calls {
                // Result correlation needs ids unique across the whole transcript.
                if tool_call.id.is_empty() || pending.has_request_id(&tool_call.id) {
                    let fresh = format!("call_{}", Uuid::new_v4().simple());
                    tracing::debug!("Reassigning tool call id {:?} to {}", tool_call.id, fresh);
                    tool_call.id = fresh;
                }
                pending.push(Turn::AssistantToolRequest {
                    request_id: tool_call.id.clone(),
                    capability_name: tool_call.function.name.clone(),
                    arguments: tool_call.function.arguments.clone(),
                });
            }

            // Sequential, in request order.
            for tool_call in tool_calls {
                tracing::info!(
                    "Calling tool: {} with args: {}",
                    tool_call.function.name,
                    tool_call.function.arguments
                );
                events.emit(AgentEvent::ToolCall {
                    id: tool_call.id.clone(),
                    name: tool_call.function.name.clone(),
                    arguments: tool_call.function.arguments.clone(),
                });

                let outcome = self
                    .tools
                    .dispatch(
                        &tool_call.function.name,
                        &tool_call.function.arguments,
                        &self.config.workspace_path,
                    )
                    .await;

                if outcome.success {
                    tracing::debug!(
                        "Tool {} returned {}",
                        tool_call.function.name,
                        truncate_for_log(&outcome.content, 200)
                    );
                } else {
                    tracing::warn!(
                        "Tool {} failed: {}",
                        tool_call.function.name,
                        truncate_for_log(&outcome.content, 200)
                    );
                }

                events.emit(AgentEvent::ToolResult {
                    id: tool_call.id.clone(),
                    name: tool_call.function.name,
                    content: outcome.content.clone(),
                    success: outcome.success,
                });
                pending.push(Turn::ToolResult {
                    request_id: tool_call.id,
                    content: outcome.content,
                    success: outcome.success,
                });
            }
        }

        tracing::warn!("Max rounds ({}) reached without a final answer", max_rounds);
        let notice = format!(
            "Round limit exceeded: stopped after {} model rounds without a final answer.",
            max_rounds
        );
        pending.push(Turn::AssistantText {
            content: notice.clone(),
        });
        pending.commit();
        events.emit(AgentEvent::RoundLimitExceeded { rounds: max_rounds });

        Ok(TurnReply {
            text: notice,
            rounds: max_rounds,
            round_limit_hit: true,
        })
    }
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &s[..end])
    }
}
