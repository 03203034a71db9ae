//! End-to-end tests for the tool-calling loop with a scripted model.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use engineer_chat::agent::{Agent, AgentEvent, EventSink, NoopSink, Transcript, Turn};
use engineer_chat::config::Config;
use engineer_chat::llm::{
    ChatMessage, ChatResponse, Choice, LlmClient, LlmError, Role, ToolCall, ToolDefinition,
};
use engineer_chat::tools::{SearchProvider, ToolRegistry};

/// Returns queued responses in order and records every request.
#[derive(Default)]
struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<ChatResponse, LlmError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<Result<ChatResponse, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat_completion(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChatResponse, LlmError> {
        assert_eq!(tools.map(|t| t.len()), Some(6), "all tools advertised");
        self.requests.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ChatResponse::tool_calls(vec![ToolCall::new("again", "list_files", "{}")])))
    }
}

struct FixedSearch(&'static str);

#[async_trait]
impl SearchProvider for FixedSearch {
    async fn answer(&self, _query: &str) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

/// Keeps every emitted event in order.
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<AgentEvent>>,
}

impl RecordingSink {
    fn new() -> Self {
        Self::default()
    }

    fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: AgentEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn agent(llm: Arc<ScriptedLlm>, workspace: &Path, max_rounds: usize) -> Agent {
    let mut config = Config::new("sk".to_string(), "tv".to_string(), workspace.to_path_buf());
    config.max_rounds = max_rounds;
    let tools = ToolRegistry::builtin(Arc::new(FixedSearch(
        "The current stable Rust release is 1.90.",
    )))
    .expect("registry");
    Agent::with_components(config, llm, tools)
}

fn tool_results(transcript: &Transcript) -> Vec<(String, String)> {
    transcript
        .turns()
        .iter()
        .filter_map(|t| match t {
            Turn::ToolResult {
                request_id,
                content,
                ..
            } => Some((request_id.clone(), content.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn create_folder_scenario() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(vec![
        Ok(ChatResponse::tool_calls(vec![ToolCall::new(
            "call_1",
            "create_folder",
            r#"{"path":"demo"}"#,
        )])),
        Ok(ChatResponse::text("The folder demo has been created.")),
    ]);
    let agent = agent(llm.clone(), dir.path(), 5);
    let mut transcript = Transcript::new();

    let reply = agent
        .run_turn(&mut transcript, "create a folder named demo", &NoopSink)
        .await
        .expect("turn");

    assert_eq!(reply.text, "The folder demo has been created.");
    assert_eq!(reply.rounds, 2);
    assert!(!reply.round_limit_hit);
    assert!(dir.path().join("demo").is_dir());

    assert_eq!(
        transcript.turns(),
        &[
            Turn::UserText {
                content: "create a folder named demo".to_string()
            },
            Turn::AssistantToolRequest {
                request_id: "call_1".to_string(),
                capability_name: "create_folder".to_string(),
                arguments: r#"{"path":"demo"}"#.to_string(),
            },
            Turn::ToolResult {
                request_id: "call_1".to_string(),
                content: "Folder created: demo".to_string(),
                success: true,
            },
            Turn::AssistantText {
                content: "The folder demo has been created.".to_string()
            },
        ]
    );
    transcript.validate().expect("consistent transcript");

    // The second call sees the tool result.
    let second = &llm.requests()[1];
    let last = second.last().unwrap();
    assert_eq!(last.role, Role::Tool);
    assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(last.content.as_deref(), Some("Folder created: demo"));
}

#[tokio::test]
async fn web_search_answer_reaches_the_model() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(vec![
        Ok(ChatResponse::tool_calls(vec![ToolCall::new(
            "s1",
            "web_search",
            r#"{"query":"latest stable rust"}"#,
        )])),
        Ok(ChatResponse::text("According to a search, Rust 1.90 is current.")),
    ]);
    let agent = agent(llm.clone(), dir.path(), 5);
    let mut transcript = Transcript::new();

    let reply = agent
        .run_turn(&mut transcript, "what is the latest rust?", &NoopSink)
        .await
        .expect("turn");

    assert_eq!(reply.text, "According to a search, Rust 1.90 is current.");
    assert_eq!(
        tool_results(&transcript),
        vec![(
            "s1".to_string(),
            "The current stable Rust release is 1.90.".to_string()
        )]
    );
    let second = &llm.requests()[1];
    assert_eq!(
        second.last().unwrap().content.as_deref(),
        Some("The current stable Rust release is 1.90.")
    );
}

#[tokio::test]
async fn batched_calls_run_in_order_before_next_model_call() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "draft").unwrap();

    let llm = ScriptedLlm::new(vec![
        Ok(ChatResponse::tool_calls(vec![
            ToolCall::new("r", "read_file", r#"{"path":"notes.txt"}"#),
            ToolCall::new("w", "write_to_file", r#"{"path":"notes.txt","content":"final"}"#),
        ])),
        Ok(ChatResponse::text("Updated notes.txt.")),
    ]);
    let agent = agent(llm.clone(), dir.path(), 5);
    let mut transcript = Transcript::new();
    let events = RecordingSink::new();

    agent
        .run_turn(&mut transcript, "finalize my notes", &events)
        .await
        .expect("turn");

    // The read ran before the write.
    assert_eq!(
        tool_results(&transcript),
        vec![
            ("r".to_string(), "draft".to_string()),
            ("w".to_string(), "Content written to file: notes.txt".to_string()),
        ]
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
        "final"
    );

    let second = &llm.requests()[1];
    let roles: Vec<Role> = second.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Tool]
    );
    assert_eq!(second[2].tool_calls.as_ref().map(|c| c.len()), Some(2));

    let tool_events: Vec<String> = events
        .events()
        .into_iter()
        .filter_map(|e| match e {
            AgentEvent::ToolCall { id, .. } => Some(format!("call {}", id)),
            AgentEvent::ToolResult { id, .. } => Some(format!("result {}", id)),
            _ => None,
        })
        .collect();
    assert_eq!(tool_events, vec!["call r", "result r", "call w", "result w"]);
}

#[tokio::test]
async fn text_alongside_tool_calls_is_kept_before_the_requests() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(vec![
        Ok(ChatResponse {
            choices: vec![Choice {
                content: Some("Let me check.".to_string()),
                tool_calls: vec![
                    ToolCall::new("a", "create_folder", r#"{"path":"src"}"#),
                    ToolCall::new("b", "list_files", "{}"),
                ],
            }],
        }),
        Ok(ChatResponse::text("There is a src folder now.")),
    ]);
    let agent = agent(llm.clone(), dir.path(), 5);
    let mut transcript = Transcript::new();

    let reply = agent
        .run_turn(&mut transcript, "set up the project", &NoopSink)
        .await
        .expect("turn");
    assert_eq!(reply.text, "There is a src folder now.");

    assert_eq!(
        &transcript.turns()[..6],
        &[
            Turn::UserText {
                content: "set up the project".to_string()
            },
            Turn::AssistantText {
                content: "Let me check.".to_string()
            },
            Turn::AssistantToolRequest {
                request_id: "a".to_string(),
                capability_name: "create_folder".to_string(),
                arguments: r#"{"path":"src"}"#.to_string(),
            },
            Turn::AssistantToolRequest {
                request_id: "b".to_string(),
                capability_name: "list_files".to_string(),
                arguments: "{}".to_string(),
            },
            Turn::ToolResult {
                request_id: "a".to_string(),
                content: "Folder created: src".to_string(),
                success: true,
            },
            Turn::ToolResult {
                request_id: "b".to_string(),
                content: "src".to_string(),
                success: true,
            },
        ]
    );
    transcript.validate().expect("consistent transcript");

    // Text and both calls travel as a single assistant message.
    let second = &llm.requests()[1];
    let roles: Vec<Role> = second.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Tool]
    );
    assert_eq!(second[2].content.as_deref(), Some("Let me check."));
    let ids: Vec<&str> = second[2]
        .tool_calls
        .as_ref()
        .expect("tool calls on the assistant message")
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn reused_tool_call_ids_are_made_unique() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(vec![
        Ok(ChatResponse::tool_calls(vec![ToolCall::new(
            "call_0",
            "list_files",
            "{}",
        )])),
        Ok(ChatResponse::text("Nothing here yet.")),
        Ok(ChatResponse::tool_calls(vec![
            ToolCall::new("call_0", "create_folder", r#"{"path":"a"}"#),
            ToolCall::new("call_0", "create_folder", r#"{"path":"b"}"#),
            ToolCall::new("", "list_files", "{}"),
        ])),
        Ok(ChatResponse::text("Created a and b.")),
    ]);
    let agent = agent(llm.clone(), dir.path(), 5);
    let mut transcript = Transcript::new();

    agent
        .run_turn(&mut transcript, "what is there?", &NoopSink)
        .await
        .expect("first turn");
    agent
        .run_turn(&mut transcript, "make a and b", &NoopSink)
        .await
        .expect("second turn");

    transcript.validate().expect("ids stay unique");

    let request_ids: Vec<String> = transcript
        .turns()
        .iter()
        .filter_map(|t| match t {
            Turn::AssistantToolRequest { request_id, .. } => Some(request_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(request_ids.len(), 4);
    assert_eq!(request_ids[0], "call_0");
    assert!(request_ids.iter().all(|id| !id.is_empty()));
    let mut unique = request_ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 4);

    // Each result answers the request it was dispatched for.
    let results: Vec<String> = tool_results(&transcript).into_iter().map(|(id, _)| id).collect();
    assert_eq!(results, request_ids);
    assert!(dir.path().join("a").is_dir());
    assert!(dir.path().join("b").is_dir());

    // The rendered history pairs every tool message with a distinct call id.
    let last = &llm.requests()[3];
    let tool_ids: Vec<&str> = last
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(tool_ids, request_ids.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn unknown_tool_and_bad_arguments_are_fed_back() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(vec![
        Ok(ChatResponse::tool_calls(vec![
            ToolCall::new("u", "format_disk", "{}"),
            ToolCall::new("m", "create_file", "{not json"),
        ])),
        Ok(ChatResponse::text("Sorry, I will try again differently.")),
    ]);
    let agent = agent(llm, dir.path(), 5);
    let mut transcript = Transcript::new();
    let events = RecordingSink::new();

    let reply = agent
        .run_turn(&mut transcript, "do something odd", &events)
        .await
        .expect("loop keeps going");

    assert_eq!(reply.text, "Sorry, I will try again differently.");
    let results = tool_results(&transcript);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].1, "Error: unknown tool: format_disk");
    assert!(results[1].1.starts_with("Error decoding arguments for create_file:"));
    transcript.validate().expect("every request resolved");

    let failures = events
        .events()
        .into_iter()
        .filter(|e| matches!(e, AgentEvent::ToolResult { success: false, .. }))
        .count();
    assert_eq!(failures, 2);
}

#[tokio::test]
async fn executor_failures_are_results_not_errors() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(vec![
        Ok(ChatResponse::tool_calls(vec![ToolCall::new(
            "x",
            "read_file",
            r#"{"path":"missing.txt"}"#,
        )])),
        Ok(ChatResponse::text("That file does not exist.")),
    ]);
    let agent = agent(llm, dir.path(), 5);
    let mut transcript = Transcript::new();

    agent
        .run_turn(&mut transcript, "read missing.txt", &NoopSink)
        .await
        .expect("turn");

    let results = tool_results(&transcript);
    assert!(results[0].1.starts_with("Error reading file:"));
}

#[tokio::test]
async fn round_cap_stops_a_model_that_never_finishes() {
    let dir = TempDir::new().unwrap();
    // No scripted responses: the model keeps asking for list_files forever.
    let llm = ScriptedLlm::new(Vec::new());
    let agent = agent(llm.clone(), dir.path(), 3);
    let mut transcript = Transcript::new();
    let events = RecordingSink::new();

    let reply = agent
        .run_turn(&mut transcript, "loop please", &events)
        .await
        .expect("turn");

    assert!(reply.round_limit_hit);
    assert_eq!(reply.rounds, 3);
    assert!(reply.text.starts_with("Round limit exceeded"));
    assert_eq!(llm.requests().len(), 3);
    assert_eq!(
        transcript.turns().last(),
        Some(&Turn::AssistantText {
            content: reply.text.clone()
        })
    );
    assert!(events
        .events()
        .contains(&AgentEvent::RoundLimitExceeded { rounds: 3 }));
}

#[tokio::test]
async fn transport_error_leaves_transcript_untouched() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(vec![
        Ok(ChatResponse::text("Hello!")),
        Ok(ChatResponse::tool_calls(vec![ToolCall::new(
            "c",
            "create_folder",
            r#"{"path":"half"}"#,
        )])),
        Err(LlmError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }),
        Ok(ChatResponse::text("Back again.")),
    ]);
    let agent = agent(llm.clone(), dir.path(), 5);
    let mut transcript = Transcript::new();

    agent
        .run_turn(&mut transcript, "hi", &NoopSink)
        .await
        .expect("first turn");
    assert_eq!(transcript.len(), 2);

    let err = agent
        .run_turn(&mut transcript, "make a folder", &NoopSink)
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Status { status: 503, .. }));
    assert_eq!(transcript.len(), 2);
    transcript.validate().expect("still consistent");

    let reply = agent
        .run_turn(&mut transcript, "are you there?", &NoopSink)
        .await
        .expect("third turn");
    assert_eq!(reply.text, "Back again.");

    // The failed turn never reached the context of the next call.
    let last_request = llm.requests().last().unwrap().clone();
    let users: Vec<_> = last_request
        .iter()
        .filter(|m| m.role == Role::User)
        .filter_map(|m| m.content.clone())
        .collect();
    assert_eq!(users, vec!["hi", "are you there?"]);
}

#[tokio::test]
async fn history_carries_across_turns() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(vec![
        Ok(ChatResponse::text("First answer.")),
        Ok(ChatResponse::text("Second answer.")),
    ]);
    let agent = agent(llm.clone(), dir.path(), 5);
    let mut transcript = Transcript::new();

    agent.run_turn(&mut transcript, "one", &NoopSink).await.unwrap();
    agent.run_turn(&mut transcript, "two", &NoopSink).await.unwrap();

    let second = &llm.requests()[1];
    let contents: Vec<_> = second.iter().filter_map(|m| m.content.clone()).skip(1).collect();
    assert_eq!(contents, vec!["one", "First answer.", "two"]);
    assert_eq!(second[0].role, Role::System);
}
