//! Agent listing tool.

use async_trait::async_trait;
use orcas_core::error::ToolError;
use orcas_core::store::WorkspaceStore;
use orcas_core::tool::{Tool, ToolContext};
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::sync::Arc;

/// Prompt excerpts are cut to this many characters.
const PROMPT_EXCERPT_CHARS: usize = 200;

pub struct ListAgentsTool {
    store: Arc<dyn WorkspaceStore>,
}

impl ListAgentsTool {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListAgentsTool {
    fn name(&self) -> &str {
        "list_agents"
    }

    fn description(&self) -> &str {
        "List the agents the user has set up, with their model and what they are for. \
         Use this to suggest who should take on a task."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _input: &Value, _ctx: &ToolContext) -> Result<String, ToolError> {
        let agents = self.store.list_agents().await?;
        if agents.is_empty() {
            return Ok("No agents are configured.".into());
        }

        let mut out = format!("{} agent(s):\n", agents.len());
        for agent in &agents {
            let prompt = agent.agent_prompt.trim();
            let excerpt: String = prompt.chars().take(PROMPT_EXCERPT_CHARS).collect();
            let ellipsis = if prompt.chars().count() > PROMPT_EXCERPT_CHARS { "..." } else { "" };
            let _ = writeln!(
                out,
                "- {} (id {}, model {}): {excerpt}{ellipsis}",
                agent.name, agent.id, agent.model_name
            );
        }
        Ok(out.trim_end().to_string())
    }
}
