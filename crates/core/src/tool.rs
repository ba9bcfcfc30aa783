//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools let the model read and change workspace state mid-turn: task notes,
//! space context, task listings, calendar events. A tool never throws across
//! the tool/engine boundary; the registry turns every failure into an
//! error-flagged `ToolResult` the model can read and recover from.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::message::{ContentBlock, ToolResultText};

/// A tool definition advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's input
    pub input_schema: serde_json::Value,
}

/// A request to execute a tool, taken from a `tool_use` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_use id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub input: serde_json::Value,
}

/// The uniform outcome of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ToolResultText>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// A successful single-text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultText { text: text.into() }],
            is_error: false,
        }
    }

    /// An error-flagged single-text result.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultText { text: text.into() }],
            is_error: true,
        }
    }

    /// All text entries joined with newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Convert into the `tool_result` block answering `tool_use_id`.
    pub fn into_block(self, tool_use_id: impl Into<String>) -> ContentBlock {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: self.content,
            is_error: self.is_error,
        }
    }
}

/// Side effects a caller may want to observe (e.g. to refresh UI state).
pub trait ToolHooks: Send + Sync {
    /// Task notes were read by the model.
    fn on_task_notes_read(&self, _task_id: i64, _content: &str) {}

    /// A space's context document was replaced.
    fn on_space_context_updated(&self, _space_id: i64, _content: &str) {}
}

/// Hooks that ignore every notification.
pub struct NoopToolHooks;

impl ToolHooks for NoopToolHooks {}

/// Ambient defaults for one turn's tool calls.
///
/// Built once before the turn starts and never mutated afterward; each call
/// resolves its identifiers against the arguments first, then these defaults.
#[derive(Clone)]
pub struct ToolContext {
    task_id: Option<i64>,
    space_id: Option<i64>,
    hooks: Arc<dyn ToolHooks>,
}

impl ToolContext {
    pub fn new() -> Self {
        Self {
            task_id: None,
            space_id: None,
            hooks: Arc::new(NoopToolHooks),
        }
    }

    pub fn with_task(mut self, task_id: i64) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_space(mut self, space_id: i64) -> Self {
        self.space_id = Some(space_id);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ToolHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn default_task_id(&self) -> Option<i64> {
        self.task_id
    }

    pub fn default_space_id(&self) -> Option<i64> {
        self.space_id
    }

    pub fn hooks(&self) -> &dyn ToolHooks {
        self.hooks.as_ref()
    }

    /// `task_id` from the arguments, else the ambient task.
    pub fn resolve_task_id(&self, input: &serde_json::Value) -> Result<i64, ToolError> {
        optional_id(input, "task_id")?
            .or(self.task_id)
            .ok_or(ToolError::MissingIdentifier {
                field: "task_id",
                subject: "task",
            })
    }

    /// `space_id` from the arguments, else the ambient space.
    pub fn resolve_space_id(&self, input: &serde_json::Value) -> Result<i64, ToolError> {
        optional_id(input, "space_id")?
            .or(self.space_id)
            .ok_or(ToolError::MissingIdentifier {
                field: "space_id",
                subject: "space",
            })
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("task_id", &self.task_id)
            .field("space_id", &self.space_id)
            .finish_non_exhaustive()
    }
}

/// Read an identifier that models send either as a number or a numeric string.
pub fn optional_id(input: &serde_json::Value, key: &str) -> Result<Option<i64>, ToolError> {
    match input.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ToolError::InvalidArguments(format!("'{key}' must be an integer"))),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ToolError::InvalidArguments(format!("'{key}' must be an integer, got \"{s}\""))),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{key}' must be an integer, got {other}"
        ))),
    }
}

/// Read a required string argument.
pub fn required_str<'a>(input: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// The core Tool trait.
///
/// Each workspace capability implements this trait and is registered in the
/// `ToolRegistry`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_task_notes").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's input.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool, returning the text handed back to the model.
    async fn execute(&self, input: &serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError>;

    /// Convert this tool into a ToolSchema for sending to the model.
    fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Dispatches a model tool call to a concrete handler.
///
/// Implementations must contain every failure in the returned `ToolResult`.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}

/// An ordered catalog of available tools.
///
/// Registration order is the order schemas are advertised to the model.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(i) => self.tools[i] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// All tool schemas, in registration order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.to_schema()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool call against `ctx`. Never fails.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return ToolResult::error(format!("Error: {}", ToolError::NotFound(call.name.clone())));
        };

        match tool.execute(&call.input, ctx).await {
            Ok(output) => {
                debug!(tool = %call.name, bytes = output.len(), "Tool call succeeded");
                ToolResult::text(output)
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                ToolResult::error(format!("Error: {e}"))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
