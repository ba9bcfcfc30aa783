//! # Orcas Core
//!
//! Domain types, traits, and error definitions for the Orcas chat turn engine.
//! This crate has **no I/O of its own**: it defines the wire-level message
//! model, the LLM invocation boundary, the tool contract, and the workspace
//! collaborators that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in their
//! respective crates:
//! - `Provider` → `orcas-providers` (Anthropic, LiteLLM)
//! - `WorkspaceStore` / `CalendarSource` → `orcas-store`
//! - `Tool` → `orcas-tools`

pub mod calendar;
pub mod error;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use calendar::{CalendarEvent, CalendarSource};
pub use error::{CalendarError, Error, ProviderError, Result, StoreError, ToolError};
pub use message::{Citation, ContentBlock, Message, MessageContent, Role, ToolResultText};
pub use provider::{ModelInfo, Provider, ProviderRequest, ProviderResponse, StopReason, Usage};
pub use store::{
    AgentProfile, NewSubTask, PLANNING_ROLE, Space, SubTask, Task, TaskStatus, WorkspaceStore,
};
pub use tool::{
    NoopToolHooks, Tool, ToolCall, ToolContext, ToolExecutor, ToolHooks, ToolRegistry, ToolResult,
    ToolSchema,
};
