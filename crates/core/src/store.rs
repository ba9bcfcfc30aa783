//! Workspace store: the persistence boundary the tools read and write.
//!
//! Spaces group tasks; each task may carry shared markdown notes, and each
//! space a context document. Agents are the user-defined assistants tasks
//! can be delegated to; subtasks are the pieces a task is planned into.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A space (project) that groups tasks and carries a context document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub context_markdown: String,
}

/// Task workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "todo" | "to_do" => Ok(Self::Todo),
            "in_progress" | "doing" => Ok(Self::InProgress),
            "done" | "completed" | "complete" => Ok(Self::Done),
            other => Err(format!(
                "Unknown task status '{other}' (expected todo, in_progress, or done)"
            )),
        }
    }
}

/// A unit of work inside a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub space_id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<String>,
}

/// A user-defined agent that work can be delegated to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: i64,
    pub name: String,
    pub model_name: String,
    pub agent_prompt: String,
    /// Set for built-in system agents (e.g. "planning"); `None` for user agents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_role: Option<String>,
}

/// A step of a task, optionally assigned to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: i64,
    pub task_id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<i64>,
    #[serde(default)]
    pub completed: bool,
}

/// Fields for a subtask insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubTask {
    pub task_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub agent_id: Option<i64>,
}

impl NewSubTask {
    pub fn new(task_id: i64, title: impl Into<String>) -> Self {
        Self {
            task_id,
            title: title.into(),
            description: None,
            agent_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_agent(mut self, agent_id: i64) -> Self {
        self.agent_id = Some(agent_id);
        self
    }
}

/// `system_role` of the built-in agent that plans tasks into subtasks.
pub const PLANNING_ROLE: &str = "planning";

/// Task, space, notes, agent, and subtask persistence.
///
/// Writes are last-writer-wins; callers that read-modify-write (such as the
/// notes append tool) can race with concurrent writers.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    async fn get_task(&self, task_id: i64) -> Result<Option<Task>, StoreError>;

    /// Tasks in a space, optionally filtered by status, ordered by id.
    async fn list_space_tasks(
        &self,
        space_id: i64,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, StoreError>;

    async fn get_space(&self, space_id: i64) -> Result<Option<Space>, StoreError>;

    /// Notes for a task; empty when none have been written yet.
    async fn read_task_notes(&self, task_id: i64) -> Result<String, StoreError>;

    /// Replace (upsert) the notes for a task.
    async fn write_task_notes(&self, task_id: i64, content: &str) -> Result<(), StoreError>;

    /// Context markdown for a space. Unknown spaces are `NotFound`.
    async fn read_space_context(&self, space_id: i64) -> Result<String, StoreError>;

    /// Replace the context markdown for a space. Unknown spaces are `NotFound`.
    async fn write_space_context(&self, space_id: i64, content: &str) -> Result<(), StoreError>;

    /// User agents (no system role), ordered by id.
    async fn list_agents(&self) -> Result<Vec<AgentProfile>, StoreError>;

    /// The system agent with `role`, if one is configured.
    async fn system_agent(&self, role: &str) -> Result<Option<AgentProfile>, StoreError>;

    /// Insert an incomplete subtask. Unknown parent tasks are `NotFound`.
    async fn create_subtask(&self, subtask: NewSubTask) -> Result<SubTask, StoreError>;

    /// Subtasks of a task, ordered by id.
    async fn list_subtasks(&self, task_id: i64) -> Result<Vec<SubTask>, StoreError>;
}
