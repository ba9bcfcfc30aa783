//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use orcas_core::error::StoreError;
use orcas_core::store::{AgentProfile, NewSubTask, Space, SubTask, Task, TaskStatus, WorkspaceStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    spaces: Vec<Space>,
    tasks: Vec<Task>,
    notes: HashMap<i64, String>,
    agents: Vec<AgentProfile>,
    subtasks: Vec<SubTask>,
}

/// A workspace store that keeps everything in process memory.
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a space by id.
    pub async fn put_space(&self, space: Space) {
        let mut state = self.state.write().await;
        match state.spaces.iter_mut().find(|s| s.id == space.id) {
            Some(existing) => *existing = space,
            None => state.spaces.push(space),
        }
    }

    /// Insert or replace a task by id.
    pub async fn put_task(&self, task: Task) {
        let mut state = self.state.write().await;
        match state.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => state.tasks.push(task),
        }
    }

    pub async fn put_agent(&self, agent: AgentProfile) {
        let mut state = self.state.write().await;
        match state.agents.iter_mut().find(|a| a.id == agent.id) {
            Some(existing) => *existing = agent,
            None => state.agents.push(agent),
        }
    }
}

#[async_trait]
impl WorkspaceStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_task(&self, task_id: i64) -> Result<Option<Task>, StoreError> {
        let state = self.state.read().await;
        Ok(state.tasks.iter().find(|t| t.id == task_id).cloned())
    }

    async fn list_space_tasks(
        &self,
        space_id: i64,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, StoreError> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| t.space_id == space_id)
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    async fn get_space(&self, space_id: i64) -> Result<Option<Space>, StoreError> {
        let state = self.state.read().await;
        Ok(state.spaces.iter().find(|s| s.id == space_id).cloned())
    }

    async fn read_task_notes(&self, task_id: i64) -> Result<String, StoreError> {
        let state = self.state.read().await;
        Ok(state.notes.get(&task_id).cloned().unwrap_or_default())
    }

    async fn write_task_notes(&self, task_id: i64, content: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.tasks.iter().any(|t| t.id == task_id) {
            return Err(StoreError::NotFound(format!("task {task_id}")));
        }
        state.notes.insert(task_id, content.to_string());
        Ok(())
    }

    async fn read_space_context(&self, space_id: i64) -> Result<String, StoreError> {
        let state = self.state.read().await;
        state
            .spaces
            .iter()
            .find(|s| s.id == space_id)
            .map(|s| s.context_markdown.clone())
            .ok_or_else(|| StoreError::NotFound(format!("space {space_id}")))
    }

    async fn write_space_context(&self, space_id: i64, content: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let space = state
            .spaces
            .iter_mut()
            .find(|s| s.id == space_id)
            .ok_or_else(|| StoreError::NotFound(format!("space {space_id}")))?;
        space.context_markdown = content.to_string();
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<AgentProfile>, StoreError> {
        let state = self.state.read().await;
        let mut agents: Vec<AgentProfile> = state
            .agents
            .iter()
            .filter(|a| a.system_role.is_none())
            .cloned()
            .collect();
        agents.sort_by_key(|a| a.id);
        Ok(agents)
    }

    async fn system_agent(&self, role: &str) -> Result<Option<AgentProfile>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .agents
            .iter()
            .find(|a| a.system_role.as_deref() == Some(role))
            .cloned())
    }

    async fn create_subtask(&self, subtask: NewSubTask) -> Result<SubTask, StoreError> {
        let mut state = self.state.write().await;
        if !state.tasks.iter().any(|t| t.id == subtask.task_id) {
            return Err(StoreError::NotFound(format!("task {}", subtask.task_id)));
        }
        let id = state.subtasks.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let created = SubTask {
            id,
            task_id: subtask.task_id,
            title: subtask.title,
            description: subtask.description,
            agent_id: subtask.agent_id,
            completed: false,
        };
        state.subtasks.push(created.clone());
        Ok(created)
    }

    async fn list_subtasks(&self, task_id: i64) -> Result<Vec<SubTask>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .subtasks
            .iter()
            .filter(|s| s.task_id == task_id)
            .cloned()
            .collect())
    }
}
