//! Tool registry and the capabilities the model may call.
//!
//! Every tool is identified by a [`CapabilityId`]. The registry is built once,
//! validated at construction, and never mutated afterwards. Dispatch never
//! fails: unknown names, malformed arguments and executor faults all come back
//! as a [`ToolOutcome`] whose text is forwarded to the model.

mod filesystem;
mod web;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::llm::{FunctionDefinition, ToolDefinition};

pub use filesystem::{CreateFile, CreateFolder, ListFiles, ReadFile, WriteToFile};
pub use web::{SearchProvider, TavilyClient, WebSearch};

/// The closed set of capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityId {
    CreateFolder,
    CreateFile,
    WriteToFile,
    ReadFile,
    ListFiles,
    WebSearch,
}

impl CapabilityId {
    pub const ALL: [CapabilityId; 6] = [
        CapabilityId::CreateFolder,
        CapabilityId::CreateFile,
        CapabilityId::WriteToFile,
        CapabilityId::ReadFile,
        CapabilityId::ListFiles,
        CapabilityId::WebSearch,
    ];

    /// Wire name used in tool definitions and tool calls.
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityId::CreateFolder => "create_folder",
            CapabilityId::CreateFile => "create_file",
            CapabilityId::WriteToFile => "write_to_file",
            CapabilityId::ReadFile => "read_file",
            CapabilityId::ListFiles => "list_files",
            CapabilityId::WebSearch => "web_search",
        }
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityId {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CapabilityId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ToolError::UnknownCapability(s.to_string()))
    }
}

/// Dispatch-time errors that are turned into tool result text.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Error: unknown tool: {0}")]
    UnknownCapability(String),

    #[error("Error decoding arguments for {tool}: {reason}")]
    ArgumentDecode { tool: String, reason: String },
}

/// Registry construction failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool registered twice: {0}")]
    DuplicateTool(CapabilityId),

    #[error("tool {tool} has an invalid parameter schema: {reason}")]
    InvalidSchema { tool: CapabilityId, reason: String },
}

/// Result of one tool dispatch.
///
/// `content` is what the model sees. `success` is only for the caller's own
/// bookkeeping and is never sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub content: String,
    pub success: bool,
}

impl ToolOutcome {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
        }
    }

    pub fn failure(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: false,
        }
    }
}

/// A capability the model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn id(&self) -> CapabilityId;

    fn description(&self) -> &str;

    /// JSON schema for the arguments object.
    fn parameters_schema(&self) -> Value;

    /// Verb phrase used in failure results, e.g. `reading file`.
    fn failure_verb(&self) -> &str;

    /// Run the tool. Relative paths resolve against `workspace`.
    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String>;

    fn name(&self) -> &'static str {
        self.id().as_str()
    }
}

/// Deserialize a tool's arguments, reporting failures as [`ToolError::ArgumentDecode`].
pub(crate) fn parse_args<T: DeserializeOwned>(tool: CapabilityId, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::ArgumentDecode {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

/// Information about a registered tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Registry of all available tools.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// The built-in tool set: filesystem tools plus web search backed by `search`.
    pub fn builtin(search: Arc<dyn SearchProvider>) -> Result<Self, RegistryError> {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(CreateFolder),
            Arc::new(CreateFile),
            Arc::new(WriteToFile),
            Arc::new(ReadFile),
            Arc::new(ListFiles),
            Arc::new(WebSearch::new(search)),
        ];
        Self::from_tools(tools)
    }

    /// Build a registry, rejecting duplicate ids and inconsistent schemas.
    pub fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Result<Self, RegistryError> {
        for (i, tool) in tools.iter().enumerate() {
            if tools[..i].iter().any(|t| t.id() == tool.id()) {
                return Err(RegistryError::DuplicateTool(tool.id()));
            }
            validate_schema(tool.id(), &tool.parameters_schema())?;
        }

        Ok(Self { tools })
    }

    /// Look up a tool by wire name.
    pub fn get(&self, name: &str) -> Result<&dyn Tool, ToolError> {
        let id: CapabilityId = name.parse()?;
        self.tools
            .iter()
            .find(|t| t.id() == id)
            .map(|t| t.as_ref())
            .ok_or_else(|| ToolError::UnknownCapability(name.to_string()))
    }

    /// List all registered tools.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Tool definitions in the format the chat-completion endpoint expects.
    pub fn get_tool_schemas(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                kind: "function".to_string(),
                function: FunctionDefinition {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.parameters_schema(),
                },
            })
            .collect()
    }

    /// Execute a tool call by name with its raw JSON argument string.
    pub async fn dispatch(&self, name: &str, raw_arguments: &str, workspace: &Path) -> ToolOutcome {
        let tool = match self.get(name) {
            Ok(tool) => tool,
            Err(e) => return ToolOutcome::failure(e.to_string()),
        };

        let args = match decode_arguments(tool.id(), raw_arguments) {
            Ok(args) => args,
            Err(e) => return ToolOutcome::failure(e.to_string()),
        };

        match tool.execute(args, workspace).await {
            Ok(output) => ToolOutcome::success(output),
            Err(e) => match e.downcast_ref::<ToolError>() {
                Some(tool_error) => ToolOutcome::failure(tool_error.to_string()),
                None => ToolOutcome::failure(format!("Error {}: {:#}", tool.failure_verb(), e)),
            },
        }
    }
}

/// Parse the model's argument string into a JSON object. An empty string means no arguments.
fn decode_arguments(tool: CapabilityId, raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let value: Value = serde_json::from_str(raw).map_err(|e| ToolError::ArgumentDecode {
        tool: tool.to_string(),
        reason: e.to_string(),
    })?;

    if !value.is_object() {
        return Err(ToolError::ArgumentDecode {
            tool: tool.to_string(),
            reason: format!("expected a JSON object, got {}", value),
        });
    }

    Ok(value)
}

fn validate_schema(tool: CapabilityId, schema: &Value) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidSchema { tool, reason };

    if schema["type"] != "object" {
        return Err(invalid("top-level type must be \"object\"".to_string()));
    }

    let properties = schema["properties"]
        .as_object()
        .ok_or_else(|| invalid("missing \"properties\" object".to_string()))?;

    for (name, property) in properties {
        if !property["type"].is_string() {
            return Err(invalid(format!("property {} has no type", name)));
        }
    }

    if let Some(required) = schema.get("required") {
        let required = required
            .as_array()
            .ok_or_else(|| invalid("\"required\" must be an array".to_string()))?;
        for name in required {
            let name = name
                .as_str()
                .ok_or_else(|| invalid("\"required\" entries must be strings".to_string()))?;
            if !properties.contains_key(name) {
                return Err(invalid(format!(
                    "required parameter {} is not declared in properties",
                    name
                )));
            }
        }
    }

    Ok(())
}
