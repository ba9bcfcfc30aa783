//! Registry-backed `ToolExecutor` bound to one turn's context.

use async_trait::async_trait;
use orcas_core::tool::{ToolCall, ToolContext, ToolExecutor, ToolRegistry, ToolResult};
use std::sync::Arc;

/// Dispatches tool calls to a shared registry using a fixed `ToolContext`.
///
/// The registry is shared across turns; the context is built per turn.
#[derive(Clone)]
pub struct WorkspaceToolExecutor {
    registry: Arc<ToolRegistry>,
    context: ToolContext,
}

impl WorkspaceToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, context: ToolContext) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn context(&self) -> &ToolContext {
        &self.context
    }
}

#[async_trait]
impl ToolExecutor for WorkspaceToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        tracing::debug!(tool = %call.name, id = %call.id, "Dispatching tool call");
        self.registry.execute(call, &self.context).await
    }
}
