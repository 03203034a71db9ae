//! Conversation transcript: the ordered turns sent to the model every round.

use std::collections::HashMap;

use thiserror::Error;

use crate::llm::{ChatMessage, Role, ToolCall};

/// One entry in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    UserText {
        content: String,
    },
    AssistantText {
        content: String,
    },
    AssistantToolRequest {
        request_id: String,
        capability_name: String,
        /// Raw JSON argument text as returned by the model.
        arguments: String,
    },
    ToolResult {
        request_id: String,
        content: String,
        /// Whether the tool succeeded. Not sent to the model.
        success: bool,
    },
}

/// Correlation problems found by [`Transcript::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("tool result {0} has no earlier request")]
    OrphanResult(String),

    #[error("tool request id {0} used more than once")]
    DuplicateRequest(String),

    #[error("tool request {0} resolved more than once")]
    DuplicateResult(String),

    #[error("tool request {0} has no result")]
    Unresolved(String),
}

/// Append-only conversation history for one session.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Start staging a user turn. Staged turns are committed with
    /// [`PendingTurn::commit`]; dropping the guard discards them.
    pub fn begin_turn(&mut self) -> PendingTurn<'_> {
        PendingTurn {
            transcript: self,
            staged: Vec::new(),
        }
    }

    /// Check request/result correlation across the whole transcript.
    pub fn validate(&self) -> Result<(), TranscriptError> {
        validate_turns(self.turns.iter())
    }
}

/// Turns staged for the user message currently being processed.
pub struct PendingTurn<'a> {
    transcript: &'a mut Transcript,
    staged: Vec<Turn>,
}

impl PendingTurn<'_> {
    pub fn push(&mut self, turn: Turn) {
        self.staged.push(turn);
    }

    /// Committed turns followed by staged ones.
    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.transcript.turns.iter().chain(self.staged.iter())
    }

    /// Whether a tool request with this id is already committed or staged.
    pub fn has_request_id(&self, id: &str) -> bool {
        self.iter().any(|turn| {
            matches!(turn, Turn::AssistantToolRequest { request_id, .. } if request_id == id)
        })
    }

    /// Ids of staged tool requests that have no result yet.
    pub fn unresolved_requests(&self) -> Vec<&str> {
        let mut open: Vec<&str> = Vec::new();
        for turn in &self.staged {
            match turn {
                Turn::AssistantToolRequest { request_id, .. } => open.push(request_id),
                Turn::ToolResult { request_id, .. } => open.retain(|id| *id != request_id.as_str()),
                _ => {}
            }
        }
        open
    }

    /// Render the system prompt plus every turn as chat messages.
    pub fn to_messages(&self, system_prompt: &str) -> Vec<ChatMessage> {
        render_messages(system_prompt, self.iter())
    }

    pub fn commit(self) {
        self.transcript.turns.extend(self.staged);
    }
}

fn validate_turns<'a>(turns: impl Iterator<Item = &'a Turn>) -> Result<(), TranscriptError> {
    // request id -> resolved?
    let mut requests: HashMap<&str, bool> = HashMap::new();

    for turn in turns {
        match turn {
            Turn::AssistantToolRequest { request_id, .. } => {
                if requests.insert(request_id.as_str(), false).is_some() {
                    return Err(TranscriptError::DuplicateRequest(request_id.clone()));
                }
            }
            Turn::ToolResult { request_id, .. } => match requests.get_mut(request_id.as_str()) {
                None => return Err(TranscriptError::OrphanResult(request_id.clone())),
                Some(true) => return Err(TranscriptError::DuplicateResult(request_id.clone())),
                Some(resolved) => *resolved = true,
            },
            _ => {}
        }
    }

    match requests.into_iter().find(|(_, resolved)| !resolved) {
        Some((id, _)) => Err(TranscriptError::Unresolved(id.to_string())),
        None => Ok(()),
    }
}

/// Convert turns into role-tagged messages.
///
/// Assistant text and the tool requests that follow it come from the same
/// model reply, so they are folded into a single assistant message.
fn render_messages<'a>(
    system_prompt: &str,
    turns: impl Iterator<Item = &'a Turn>,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(system_prompt)];
    let mut assistant: Option<ChatMessage> = None;

    for turn in turns {
        match turn {
            Turn::UserText { content } => {
                messages.extend(assistant.take());
                messages.push(ChatMessage::user(content.clone()));
            }
            Turn::AssistantText { content } => {
                messages.extend(assistant.take());
                assistant = Some(ChatMessage::assistant(content.clone()));
            }
            Turn::AssistantToolRequest {
                request_id,
                capability_name,
                arguments,
            } => {
                let message = assistant.get_or_insert_with(|| ChatMessage {
                    role: Role::Assistant,
                    content: None,
                    tool_calls: None,
                    tool_call_id: None,
                });
                message
                    .tool_calls
                    .get_or_insert_with(Vec::new)
                    .push(ToolCall::new(request_id.clone(), capability_name.clone(), arguments.clone()));
            }
            Turn::ToolResult {
                request_id,
                content,
                ..
            } => {
                messages.extend(assistant.take());
                messages.push(ChatMessage::tool_result(request_id.clone(), content.clone()));
            }
        }
    }

    messages.extend(assistant);
    messages
}
