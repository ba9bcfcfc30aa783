//! Workspace tool implementations for Orcas.
//!
//! Tools let the model work with the user's workspace during a chat turn:
//! read and write task notes, read and update a space's context document,
//! look up tasks and calendar events, and list the available agents.
//!
//! Planning a task uses a separate registry holding only `create_subtask`.

pub mod agents;
pub mod calendar;
pub mod executor;
pub mod notes;
pub mod space_context;
pub mod subtasks;
pub mod tasks;

use orcas_core::calendar::CalendarSource;
use orcas_core::store::WorkspaceStore;
use orcas_core::tool::ToolRegistry;
use std::sync::Arc;

pub use executor::WorkspaceToolExecutor;

/// Create the tool registry with every workspace tool, in advertised order.
pub fn default_registry(
    store: Arc<dyn WorkspaceStore>,
    calendar: Arc<dyn CalendarSource>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(notes::ReadTaskNotesTool::new(store.clone())));
    registry.register(Box::new(notes::WriteTaskNotesTool::new(store.clone())));
    registry.register(Box::new(notes::CheckTaskNotesTool::new(store.clone())));
    registry.register(Box::new(space_context::ReadSpaceContextTool::new(store.clone())));
    registry.register(Box::new(space_context::UpdateSpaceContextTool::new(store.clone())));
    registry.register(Box::new(tasks::GetTaskDetailsTool::new(store.clone())));
    registry.register(Box::new(tasks::ListSpaceTasksTool::new(store.clone())));
    registry.register(Box::new(calendar::GetCalendarEventsTool::new(calendar)));
    registry.register(Box::new(agents::ListAgentsTool::new(store)));
    registry
}

/// Create the registry the task planner works with.
pub fn planning_registry(store: Arc<dyn WorkspaceStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(subtasks::CreateSubtaskTool::new(store)));
    registry
}
