//! Task lookup tools.

use async_trait::async_trait;
use orcas_core::error::{StoreError, ToolError};
use orcas_core::store::{Task, TaskStatus, WorkspaceStore};
use orcas_core::tool::{Tool, ToolContext};
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::sync::Arc;

pub struct GetTaskDetailsTool {
    store: Arc<dyn WorkspaceStore>,
}

impl GetTaskDetailsTool {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetTaskDetailsTool {
    fn name(&self) -> &str {
        "get_task_details"
    }

    fn description(&self) -> &str {
        "Get the title, status, priority, dates, and description of a task."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "integer",
                    "description": "The task to look up. Defaults to the task this chat is about."
                }
            },
            "required": []
        })
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let task_id = ctx.resolve_task_id(input)?;
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("task {task_id}")))?;

        Ok(format_task_details(&task))
    }
}

fn format_task_details(task: &Task) -> String {
    let mut out = format!("Task #{}: {}\n", task.id, task.title);
    let _ = writeln!(out, "Status: {}", task.status);
    let _ = writeln!(out, "Priority: {}", task.priority);
    let _ = writeln!(out, "Space: {}", task.space_id);
    if let Some(due) = &task.due_date {
        let _ = writeln!(out, "Due: {due}");
    }
    if let Some(scheduled) = &task.scheduled_date {
        let _ = writeln!(out, "Scheduled: {scheduled}");
    }
    match task.description.as_deref().map(str::trim) {
        Some(desc) if !desc.is_empty() => {
            let _ = write!(out, "\nDescription:\n{desc}");
        }
        _ => out.push_str("\nNo description."),
    }
    out
}

pub struct ListSpaceTasksTool {
    store: Arc<dyn WorkspaceStore>,
}

impl ListSpaceTasksTool {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListSpaceTasksTool {
    fn name(&self) -> &str {
        "list_space_tasks"
    }

    fn description(&self) -> &str {
        "List the tasks in a space, optionally filtered by status."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "space_id": {
                    "type": "integer",
                    "description": "The space to list. Defaults to the space this chat is about."
                },
                "status": {
                    "type": "string",
                    "enum": ["todo", "in_progress", "done"],
                    "description": "Only return tasks with this status"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let space_id = ctx.resolve_space_id(input)?;
        let status = match input.get("status").and_then(Value::as_str) {
            Some(s) => Some(s.parse::<TaskStatus>().map_err(ToolError::InvalidArguments)?),
            None => None,
        };

        let tasks = self.store.list_space_tasks(space_id, status).await?;

        if tasks.is_empty() {
            return Ok(match status {
                Some(s) => format!("No tasks with status {s} in space {space_id}."),
                None => format!("No tasks in space {space_id}."),
            });
        }

        let mut out = format!("{} task(s) in space {space_id}:\n", tasks.len());
        for task in &tasks {
            let _ = write!(
                out,
                "- #{} [{}] {} (priority: {}",
                task.id, task.status, task.title, task.priority
            );
            if let Some(due) = &task.due_date {
                let _ = write!(out, ", due: {due}");
            }
            out.push_str(")\n");
        }
        Ok(out.trim_end().to_string())
    }
}
