//! Subtask creation tool, used when planning a task.

use async_trait::async_trait;
use orcas_core::error::ToolError;
use orcas_core::store::{NewSubTask, WorkspaceStore};
use orcas_core::tool::{Tool, ToolContext, optional_id, required_str};
use serde_json::{Value, json};
use std::sync::Arc;

/// Creates a subtask under the task being planned.
///
/// The parent task always comes from the context; the model only chooses the
/// title, the description and which user agent takes the work.
pub struct CreateSubtaskTool {
    store: Arc<dyn WorkspaceStore>,
}

impl CreateSubtaskTool {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateSubtaskTool {
    fn name(&self) -> &str {
        "create_subtask"
    }

    fn description(&self) -> &str {
        "Create a new subtask for the task being planned and assign it to the agent best \
         suited for it."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Clear, action-oriented title for the subtask"
                },
                "description": {
                    "type": "string",
                    "description": "Scope, deliverables, and expectations for the subtask"
                },
                "agent_id": {
                    "type": "integer",
                    "description": "ID of the agent best suited for this subtask"
                }
            },
            "required": ["title", "description", "agent_id"]
        })
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let task_id = ctx.default_task_id().ok_or(ToolError::MissingIdentifier {
            field: "task_id",
            subject: "task",
        })?;
        let title = required_str(input, "title")?.trim();
        if title.is_empty() {
            return Err(ToolError::InvalidArguments("'title' must not be empty".into()));
        }
        let description = required_str(input, "description")?;
        let agent_id = optional_id(input, "agent_id")?
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'agent_id' argument".into()))?;

        let agents = self.store.list_agents().await?;
        if !agents.iter().any(|a| a.id == agent_id) {
            return Err(ToolError::InvalidArguments(format!("Invalid agent_id: {agent_id}")));
        }

        let subtask = self
            .store
            .create_subtask(
                NewSubTask::new(task_id, title)
                    .with_description(description)
                    .with_agent(agent_id),
            )
            .await?;
        tracing::debug!(task_id, subtask_id = subtask.id, agent_id, "Subtask created");

        Ok(format!("Successfully created subtask: '{}'", subtask.title))
    }
}
