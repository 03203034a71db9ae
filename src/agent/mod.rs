//! Agent module - the tool-calling conversation loop.
//!
//! The agent follows a "tools in a loop" pattern for every user message:
//! 1. Append the message to the transcript
//! 2. Call the LLM with the whole transcript and all tool schemas
//! 3. If the LLM requests tool calls, execute them in order and append the results
//! 4. Repeat until the LLM replies without tool calls or the round cap is reached

mod agent_loop;
mod events;
mod prompt;
mod transcript;

pub use agent_loop::{Agent, TurnReply};
pub use events::{AgentEvent, EventSink, NoopSink};
pub use prompt::build_system_prompt;
pub use transcript::{PendingTurn, Transcript, TranscriptError, Turn};
