//! Events reported to the presenter while a turn runs.

/// Progress events emitted while a user turn is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Free text from a model reply (intermediate or final).
    AssistantText { content: String },
    /// The model requested a tool call.
    ToolCall {
        id: String,
        name: String,
        arguments: String,
    },
    /// A tool call finished.
    ToolResult {
        id: String,
        name: String,
        content: String,
        success: bool,
    },
    /// The round cap was reached before the model produced a final answer.
    RoundLimitExceeded { rounds: usize },
}

/// Receiver for [`AgentEvent`]s, usually the terminal presenter.
pub trait EventSink {
    fn emit(&self, event: AgentEvent);
}

/// Sink that drops every event.
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: AgentEvent) {}
}
