//! Space context tools: the markdown document describing a space.

use async_trait::async_trait;
use orcas_core::error::ToolError;
use orcas_core::store::WorkspaceStore;
use orcas_core::tool::{Tool, ToolContext, required_str};
use serde_json::{Value, json};
use std::sync::Arc;

fn space_id_property() -> Value {
    json!({
        "type": "integer",
        "description": "The space to use. Defaults to the space this chat is about."
    })
}

pub struct ReadSpaceContextTool {
    store: Arc<dyn WorkspaceStore>,
}

impl ReadSpaceContextTool {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadSpaceContextTool {
    fn name(&self) -> &str {
        "read_space_context"
    }

    fn description(&self) -> &str {
        "Read the context document for a space: goals, constraints, and background shared by all its tasks."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "space_id": space_id_property() },
            "required": []
        })
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let space_id = ctx.resolve_space_id(input)?;
        let context = self.store.read_space_context(space_id).await?;

        if context.trim().is_empty() {
            Ok(format!("Space {space_id} has no context document yet."))
        } else {
            Ok(context)
        }
    }
}

pub struct UpdateSpaceContextTool {
    store: Arc<dyn WorkspaceStore>,
}

impl UpdateSpaceContextTool {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateSpaceContextTool {
    fn name(&self) -> &str {
        "update_space_context"
    }

    fn description(&self) -> &str {
        "Replace the context document for a space with new markdown. \
         Read it first if you only mean to change part of it."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The complete new context document (markdown)"
                },
                "space_id": space_id_property()
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let content = required_str(input, "content")?;
        let space_id = ctx.resolve_space_id(input)?;

        self.store.write_space_context(space_id, content).await?;
        ctx.hooks().on_space_context_updated(space_id, content);

        Ok(format!(
            "Context for space {space_id} updated ({} characters).",
            content.chars().count()
        ))
    }
}
