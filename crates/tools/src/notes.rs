//! Task notes tools: shared markdown notes attached to a task.

use async_trait::async_trait;
use orcas_core::error::ToolError;
use orcas_core::store::WorkspaceStore;
use orcas_core::tool::{Tool, ToolContext, required_str};
use serde_json::{Value, json};
use std::sync::Arc;

fn task_id_property() -> Value {
    json!({
        "type": "integer",
        "description": "The task whose notes to use. Defaults to the task this chat is about."
    })
}

pub struct ReadTaskNotesTool {
    store: Arc<dyn WorkspaceStore>,
}

impl ReadTaskNotesTool {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadTaskNotesTool {
    fn name(&self) -> &str {
        "read_task_notes"
    }

    fn description(&self) -> &str {
        "Read the shared markdown notes for a task. Notes are shared between the user and agents."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "task_id": task_id_property() },
            "required": []
        })
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let task_id = ctx.resolve_task_id(input)?;
        let notes = self.store.read_task_notes(task_id).await?;
        ctx.hooks().on_task_notes_read(task_id, &notes);

        if notes.trim().is_empty() {
            Ok(format!("No notes have been written for task {task_id} yet."))
        } else {
            Ok(notes)
        }
    }
}

/// How `write_task_notes` combines new content with existing notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Append,
    Replace,
}

impl WriteMode {
    fn from_input(input: &Value) -> Result<Self, ToolError> {
        match input.get("mode").and_then(Value::as_str) {
            None | Some("append") => Ok(Self::Append),
            Some("replace") => Ok(Self::Replace),
            Some(other) => Err(ToolError::InvalidArguments(format!(
                "Unknown mode '{other}' (expected 'append' or 'replace')"
            ))),
        }
    }
}

pub struct WriteTaskNotesTool {
    store: Arc<dyn WorkspaceStore>,
}

impl WriteTaskNotesTool {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for WriteTaskNotesTool {
    fn name(&self) -> &str {
        "write_task_notes"
    }

    fn description(&self) -> &str {
        "Write to the shared markdown notes for a task. By default the content is appended \
         after the existing notes; use mode 'replace' to overwrite them."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "Markdown to write"
                },
                "task_id": task_id_property(),
                "mode": {
                    "type": "string",
                    "enum": ["append", "replace"],
                    "description": "append (default) adds to the existing notes; replace overwrites them"
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let content = required_str(input, "content")?;
        let mode = WriteMode::from_input(input)?;
        let task_id = ctx.resolve_task_id(input)?;

        // Read-then-write; a concurrent writer to the same notes can be lost.
        let updated = match mode {
            WriteMode::Replace => content.to_string(),
            WriteMode::Append => {
                let existing = self.store.read_task_notes(task_id).await?;
                if existing.trim().is_empty() {
                    content.to_string()
                } else {
                    format!("{}\n\n{content}", existing.trim_end())
                }
            }
        };

        self.store.write_task_notes(task_id, &updated).await?;

        let verb = match mode {
            WriteMode::Append => "Appended to",
            WriteMode::Replace => "Replaced",
        };
        Ok(format!(
            "{verb} notes for task {task_id} ({} characters total).",
            updated.chars().count()
        ))
    }
}

pub struct CheckTaskNotesTool {
    store: Arc<dyn WorkspaceStore>,
}

impl CheckTaskNotesTool {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CheckTaskNotesTool {
    fn name(&self) -> &str {
        "check_task_notes"
    }

    fn description(&self) -> &str {
        "Check whether a task has any notes without reading them in full."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "task_id": task_id_property() },
            "required": []
        })
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let task_id = ctx.resolve_task_id(input)?;
        let notes = self.store.read_task_notes(task_id).await?;

        if notes.trim().is_empty() {
            Ok(format!("Task {task_id} has no notes yet."))
        } else {
            Ok(format!(
                "Task {task_id} has notes ({} characters, {} lines).",
                notes.chars().count(),
                notes.lines().count()
            ))
        }
    }
}
