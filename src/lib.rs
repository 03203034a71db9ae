//! # Engineer Chat
//!
//! A terminal chat agent that lets an LLM work on a local project.
//!
//! This library provides:
//! - A tool-calling agent loop over an OpenAI-compatible chat endpoint
//! - File system tools (create folders and files, read, overwrite, list)
//! - A web search tool backed by a question-answering search API
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Read a line from the operator
//! 2. Send the whole transcript plus tool schemas to the LLM
//! 3. Execute any requested tool calls in order and append their results
//! 4. Repeat until the LLM answers without tool calls
//!
//! ## Example
//!
//! ```rust,ignore
//! use engineer_chat::{agent::{Agent, NoopSink, Transcript}, config::Config};
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(config)?;
//! let mut transcript = Transcript::new();
//! let reply = agent.run_turn(&mut transcript, "Create a hello world script", &NoopSink).await?;
//! ```

pub mod agent;
pub mod config;
pub mod console;
pub mod llm;
pub mod tools;

pub use config::Config;
