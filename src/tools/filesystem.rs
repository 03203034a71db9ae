//! File system tools: create folders and files, read, overwrite, list.
//!
//! Paths are taken as given by the model. Relative paths are joined onto the
//! workspace; absolute paths replace it. Nothing is sandboxed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, CapabilityId, Tool};

fn resolve_path(workspace: &Path, path: &str) -> PathBuf {
    workspace.join(path)
}

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

#[derive(Deserialize)]
struct CreateFileArgs {
    path: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
}

#[derive(Deserialize)]
struct ListArgs {
    #[serde(default = "current_dir")]
    path: String,
}

fn current_dir() -> String {
    ".".to_string()
}

/// Create a folder and any missing parents.
pub struct CreateFolder;

#[async_trait]
impl Tool for CreateFolder {
    fn id(&self) -> CapabilityId {
        CapabilityId::CreateFolder
    }

    fn description(&self) -> &str {
        "Create a new folder at the specified path. Use this when you need to create a new directory in the project structure."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path where the folder should be created"
                }
            },
            "required": ["path"]
        })
    }

    fn failure_verb(&self) -> &str {
        "creating folder"
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let args: PathArgs = parse_args(self.id(), args)?;
        tokio::fs::create_dir_all(resolve_path(workspace, &args.path)).await?;
        Ok(format!("Folder created: {}", args.path))
    }
}

/// Create (or truncate) a file with optional initial content.
pub struct CreateFile;

#[async_trait]
impl Tool for CreateFile {
    fn id(&self) -> CapabilityId {
        CapabilityId::CreateFile
    }

    fn description(&self) -> &str {
        "Create a new file at the specified path with optional content. Use this when you need to create a new file in the project structure."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path where the file should be created"
                },
                "content": {
                    "type": "string",
                    "description": "The initial content of the file (optional)"
                }
            },
            "required": ["path"]
        })
    }

    fn failure_verb(&self) -> &str {
        "creating file"
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let args: CreateFileArgs = parse_args(self.id(), args)?;
        tokio::fs::write(resolve_path(workspace, &args.path), args.content).await?;
        Ok(format!("File created: {}", args.path))
    }
}

/// Overwrite a file's full contents.
pub struct WriteToFile;

#[async_trait]
impl Tool for WriteToFile {
    fn id(&self) -> CapabilityId {
        CapabilityId::WriteToFile
    }

    fn description(&self) -> &str {
        "Write content to an existing file at the specified path. Use this when you need to add or update content in an existing file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path of the file to write to"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    fn failure_verb(&self) -> &str {
        "writing to file"
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let args: WriteArgs = parse_args(self.id(), args)?;
        tokio::fs::write(resolve_path(workspace, &args.path), args.content).await?;
        Ok(format!("Content written to file: {}", args.path))
    }
}

/// Read a whole file as text.
pub struct ReadFile;

#[async_trait]
impl Tool for ReadFile {
    fn id(&self) -> CapabilityId {
        CapabilityId::ReadFile
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the specified path. Use this when you need to examine the contents of an existing file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path of the file to read"
                }
            },
            "required": ["path"]
        })
    }

    fn failure_verb(&self) -> &str {
        "reading file"
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let args: PathArgs = parse_args(self.id(), args)?;
        let content = tokio::fs::read_to_string(resolve_path(workspace, &args.path)).await?;
        Ok(content)
    }
}

/// List the direct children of a directory.
pub struct ListFiles;

#[async_trait]
impl Tool for ListFiles {
    fn id(&self) -> CapabilityId {
        CapabilityId::ListFiles
    }

    fn description(&self) -> &str {
        "List all files and directories in the given folder (default: the current directory). Use this when you need to see the contents of a directory."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path of the folder to list (default: current directory)"
                }
            }
        })
    }

    fn failure_verb(&self) -> &str {
        "listing files"
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let args: ListArgs = parse_args(self.id(), args)?;
        let mut entries = tokio::fs::read_dir(resolve_path(workspace, &args.path)).await?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        Ok(names.join("\n"))
    }
}
