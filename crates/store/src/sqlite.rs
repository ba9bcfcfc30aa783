//! SQLite workspace store.
//!
//! One database file with five tables:
//! - `spaces` - spaces and their context markdown
//! - `tasks` - tasks, keyed to a space
//! - `task_notes` - one notes document per task (upserted)
//! - `agents` - user and system agents
//! - `subtasks` - planned steps of a task, optionally assigned to an agent
//!
//! The schema is created on open.

use async_trait::async_trait;
use orcas_core::error::StoreError;
use orcas_core::store::{AgentProfile, NewSubTask, Space, SubTask, Task, TaskStatus, WorkspaceStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::info;

/// Fields for a task insert.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub space_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: String,
    pub due_date: Option<String>,
}

impl NewTask {
    pub fn new(space_id: i64, title: impl Into<String>) -> Self {
        Self {
            space_id,
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            priority: "medium".into(),
            due_date: None,
        }
    }
}

/// A SQLite-backed workspace store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // Every connection to `:memory:` is a separate database.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite workspace store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements = [
            (
                "spaces table",
                r#"
                CREATE TABLE IF NOT EXISTS spaces (
                    id               INTEGER PRIMARY KEY AUTOINCREMENT,
                    title            TEXT NOT NULL,
                    description      TEXT,
                    context_markdown TEXT NOT NULL DEFAULT '',
                    created_at       TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at       TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )
                "#,
            ),
            (
                "tasks table",
                r#"
                CREATE TABLE IF NOT EXISTS tasks (
                    id             INTEGER PRIMARY KEY AUTOINCREMENT,
                    space_id       INTEGER NOT NULL REFERENCES spaces(id) ON DELETE CASCADE,
                    title          TEXT NOT NULL,
                    description    TEXT,
                    status         TEXT NOT NULL DEFAULT 'todo',
                    priority       TEXT NOT NULL DEFAULT 'medium',
                    due_date       TEXT,
                    scheduled_date TEXT,
                    created_at     TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at     TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )
                "#,
            ),
            (
                "task_notes table",
                r#"
                CREATE TABLE IF NOT EXISTS task_notes (
                    task_id    INTEGER PRIMARY KEY REFERENCES tasks(id) ON DELETE CASCADE,
                    content    TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )
                "#,
            ),
            (
                "agents table",
                r#"
                CREATE TABLE IF NOT EXISTS agents (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    name         TEXT NOT NULL,
                    model_name   TEXT NOT NULL,
                    agent_prompt TEXT NOT NULL,
                    system_role  TEXT
                )
                "#,
            ),
            (
                "subtasks table",
                r#"
                CREATE TABLE IF NOT EXISTS subtasks (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    task_id     INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                    title       TEXT NOT NULL,
                    description TEXT,
                    agent_id    INTEGER REFERENCES agents(id) ON DELETE SET NULL,
                    completed   INTEGER NOT NULL DEFAULT 0,
                    created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )
                "#,
            ),
            (
                "subtasks index",
                "CREATE INDEX IF NOT EXISTS idx_subtasks_task ON subtasks(task_id)",
            ),
            (
                "tasks index",
                "CREATE INDEX IF NOT EXISTS idx_tasks_space ON tasks(space_id, status)",
            ),
        ];

        for (label, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{label}: {e}")))?;
        }

        Ok(())
    }

    /// Insert a space and return it.
    pub async fn create_space(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Space, StoreError> {
        let result = sqlx::query("INSERT INTO spaces (title, description) VALUES (?1, ?2)")
            .bind(title)
            .bind(description)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT space failed: {e}")))?;

        Ok(Space {
            id: result.last_insert_rowid(),
            title: title.to_string(),
            description: description.map(str::to_string),
            context_markdown: String::new(),
        })
    }

    /// Insert a task and return it.
    pub async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let result = sqlx::query(
            "INSERT INTO tasks (space_id, title, description, status, priority, due_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(task.space_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(&task.priority)
        .bind(&task.due_date)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT task failed: {e}")))?;

        Ok(Task {
            id: result.last_insert_rowid(),
            space_id: task.space_id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            scheduled_date: None,
        })
    }

    /// Insert an agent and return it.
    pub async fn create_agent(
        &self,
        name: &str,
        model_name: &str,
        agent_prompt: &str,
        system_role: Option<&str>,
    ) -> Result<AgentProfile, StoreError> {
        let result = sqlx::query(
            "INSERT INTO agents (name, model_name, agent_prompt, system_role) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(name)
        .bind(model_name)
        .bind(agent_prompt)
        .bind(system_role)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT agent failed: {e}")))?;

        Ok(AgentProfile {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            model_name: model_name.to_string(),
            agent_prompt: agent_prompt.to_string(),
            system_role: system_role.map(str::to_string),
        })
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task, StoreError> {
        let get_err = |col: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{col} column: {e}"));

        let status: String = row.try_get("status").map_err(|e| get_err("status", e))?;
        let status = TaskStatus::from_str(&status).map_err(StoreError::QueryFailed)?;

        Ok(Task {
            id: row.try_get("id").map_err(|e| get_err("id", e))?,
            space_id: row.try_get("space_id").map_err(|e| get_err("space_id", e))?,
            title: row.try_get("title").map_err(|e| get_err("title", e))?,
            description: row.try_get("description").map_err(|e| get_err("description", e))?,
            status,
            priority: row.try_get("priority").map_err(|e| get_err("priority", e))?,
            due_date: row.try_get("due_date").map_err(|e| get_err("due_date", e))?,
            scheduled_date: row
                .try_get("scheduled_date")
                .map_err(|e| get_err("scheduled_date", e))?,
        })
    }

    fn row_to_agent(row: &sqlx::sqlite::SqliteRow) -> Result<AgentProfile, StoreError> {
        let get_err = |e: sqlx::Error| StoreError::QueryFailed(format!("agent row: {e}"));
        Ok(AgentProfile {
            id: row.try_get("id").map_err(get_err)?,
            name: row.try_get("name").map_err(get_err)?,
            model_name: row.try_get("model_name").map_err(get_err)?,
            agent_prompt: row.try_get("agent_prompt").map_err(get_err)?,
            system_role: row.try_get("system_role").map_err(get_err)?,
        })
    }

    async fn task_exists(&self, task_id: i64) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM tasks WHERE id = ?1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("task lookup: {e}")))?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl WorkspaceStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get_task(&self, task_id: i64) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET task: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_task(r)?)),
            None => Ok(None),
        }
    }

    async fn list_space_tasks(
        &self,
        space_id: i64,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, StoreError> {
        let rows = match status {
            Some(status) => {
                sqlx::query("SELECT * FROM tasks WHERE space_id = ?1 AND status = ?2 ORDER BY id")
                    .bind(space_id)
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM tasks WHERE space_id = ?1 ORDER BY id")
                    .bind(space_id)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| StoreError::QueryFailed(format!("LIST tasks: {e}")))?;

        rows.iter().map(Self::row_to_task).collect()
    }

    async fn get_space(&self, space_id: i64) -> Result<Option<Space>, StoreError> {
        let row = sqlx::query("SELECT id, title, description, context_markdown FROM spaces WHERE id = ?1")
            .bind(space_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET space: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let get_err = |e: sqlx::Error| StoreError::QueryFailed(format!("space row: {e}"));
        Ok(Some(Space {
            id: row.try_get("id").map_err(get_err)?,
            title: row.try_get("title").map_err(get_err)?,
            description: row.try_get("description").map_err(get_err)?,
            context_markdown: row.try_get("context_markdown").map_err(get_err)?,
        }))
    }

    async fn read_task_notes(&self, task_id: i64) -> Result<String, StoreError> {
        let row = sqlx::query("SELECT content FROM task_notes WHERE task_id = ?1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("READ notes: {e}")))?;

        match row {
            Some(row) => {
                let content: Option<String> = row
                    .try_get("content")
                    .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))?;
                Ok(content.unwrap_or_default())
            }
            None => Ok(String::new()),
        }
    }

    async fn write_task_notes(&self, task_id: i64, content: &str) -> Result<(), StoreError> {
        if !self.task_exists(task_id).await? {
            return Err(StoreError::NotFound(format!("task {task_id}")));
        }

        sqlx::query(
            "INSERT INTO task_notes (task_id, content, created_at, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
             ON CONFLICT(task_id) DO UPDATE SET
             content = excluded.content,
             updated_at = CURRENT_TIMESTAMP",
        )
        .bind(task_id)
        .bind(content)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPSERT notes failed: {e}")))?;

        Ok(())
    }

    async fn read_space_context(&self, space_id: i64) -> Result<String, StoreError> {
        let row = sqlx::query("SELECT context_markdown FROM spaces WHERE id = ?1")
            .bind(space_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("READ space context: {e}")))?
            .ok_or_else(|| StoreError::NotFound(format!("space {space_id}")))?;

        row.try_get("context_markdown")
            .map_err(|e| StoreError::QueryFailed(format!("context_markdown column: {e}")))
    }

    async fn write_space_context(&self, space_id: i64, content: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE spaces SET context_markdown = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
        )
        .bind(content)
        .bind(space_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPDATE space context failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("space {space_id}")));
        }
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<AgentProfile>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, model_name, agent_prompt, system_role FROM agents
             WHERE system_role IS NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("LIST agents: {e}")))?;

        rows.iter().map(Self::row_to_agent).collect()
    }

    async fn system_agent(&self, role: &str) -> Result<Option<AgentProfile>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, model_name, agent_prompt, system_role FROM agents
             WHERE system_role = ?1 ORDER BY id LIMIT 1",
        )
        .bind(role)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("GET system agent: {e}")))?;

        row.as_ref().map(Self::row_to_agent).transpose()
    }

    async fn create_subtask(&self, subtask: NewSubTask) -> Result<SubTask, StoreError> {
        if !self.task_exists(subtask.task_id).await? {
            return Err(StoreError::NotFound(format!("task {}", subtask.task_id)));
        }

        let result = sqlx::query(
            "INSERT INTO subtasks (task_id, title, description, agent_id, completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
        )
        .bind(subtask.task_id)
        .bind(&subtask.title)
        .bind(&subtask.description)
        .bind(subtask.agent_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT subtask failed: {e}")))?;

        Ok(SubTask {
            id: result.last_insert_rowid(),
            task_id: subtask.task_id,
            title: subtask.title,
            description: subtask.description,
            agent_id: subtask.agent_id,
            completed: false,
        })
    }

    async fn list_subtasks(&self, task_id: i64) -> Result<Vec<SubTask>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, task_id, title, description, agent_id, completed FROM subtasks
             WHERE task_id = ?1 ORDER BY id",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("LIST subtasks: {e}")))?;

        let get_err = |e: sqlx::Error| StoreError::QueryFailed(format!("subtask row: {e}"));
        rows.iter()
            .map(|row| -> Result<SubTask, StoreError> {
                Ok(SubTask {
                    id: row.try_get("id").map_err(get_err)?,
                    task_id: row.try_get("task_id").map_err(get_err)?,
                    title: row.try_get("title").map_err(get_err)?,
                    description: row.try_get("description").map_err(get_err)?,
                    agent_id: row.try_get("agent_id").map_err(get_err)?,
                    completed: row.try_get("completed").map_err(get_err)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn store_name() {
        assert_eq!(test_store().await.name(), "sqlite");
    }

    #[tokio::test]
    async fn create_and_get_task() {
        let store = test_store().await;
        let space = store.create_space("Launch", Some("Q3 launch")).await.unwrap();
        let mut new = NewTask::new(space.id, "Draft announcement");
        new.status = TaskStatus::InProgress;
        let task = store.create_task(new).await.unwrap();

        let fetched = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(fetched, task);
        assert!(store.get_task(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_tasks_with_status_filter() {
        let store = test_store().await;
        let space = store.create_space("Launch", None).await.unwrap();
        store.create_task(NewTask::new(space.id, "a")).await.unwrap();
        let mut done = NewTask::new(space.id, "b");
        done.status = TaskStatus::Done;
        store.create_task(done).await.unwrap();

        assert_eq!(store.list_space_tasks(space.id, None).await.unwrap().len(), 2);
        let only_done = store
            .list_space_tasks(space.id, Some(TaskStatus::Done))
            .await
            .unwrap();
        assert_eq!(only_done.len(), 1);
        assert_eq!(only_done[0].title, "b");
    }

    #[tokio::test]
    async fn notes_upsert() {
        let store = test_store().await;
        let space = store.create_space("Launch", None).await.unwrap();
        let task = store.create_task(NewTask::new(space.id, "a")).await.unwrap();

        assert_eq!(store.read_task_notes(task.id).await.unwrap(), "");
        store.write_task_notes(task.id, "v1").await.unwrap();
        store.write_task_notes(task.id, "v2").await.unwrap();
        assert_eq!(store.read_task_notes(task.id).await.unwrap(), "v2");

        assert!(matches!(
            store.write_task_notes(404, "orphan").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn space_context_round_trip() {
        let store = test_store().await;
        let space = store.create_space("Launch", None).await.unwrap();
        assert_eq!(store.read_space_context(space.id).await.unwrap(), "");

        store.write_space_context(space.id, "# Goals").await.unwrap();
        assert_eq!(store.read_space_context(space.id).await.unwrap(), "# Goals");
        assert_eq!(
            store.get_space(space.id).await.unwrap().unwrap().context_markdown,
            "# Goals"
        );

        assert!(matches!(
            store.read_space_context(77).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.write_space_context(77, "x").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn agents_exclude_system_roles() {
        let store = test_store().await;
        store
            .create_agent("Planner", "claude-sonnet-4", "Plan work", Some("planning"))
            .await
            .unwrap();
        store
            .create_agent("Researcher", "claude-opus-4", "Dig deep", None)
            .await
            .unwrap();

        let agents = store.list_agents().await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name, "Researcher");

        let planner = store.system_agent("planning").await.unwrap().unwrap();
        assert_eq!(planner.name, "Planner");
        assert!(store.system_agent("review").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn subtasks_persist_with_assignment() {
        let store = test_store().await;
        let space = store.create_space("Launch", None).await.unwrap();
        let task = store.create_task(NewTask::new(space.id, "Ship v2")).await.unwrap();
        let agent = store
            .create_agent("Writer", "claude-haiku-4", "Write copy", None)
            .await
            .unwrap();

        let created = store
            .create_subtask(
                NewSubTask::new(task.id, "Draft post")
                    .with_description("800 words")
                    .with_agent(agent.id),
            )
            .await
            .unwrap();
        store
            .create_subtask(NewSubTask::new(task.id, "Proofread"))
            .await
            .unwrap();

        let listed = store.list_subtasks(task.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], created);
        assert_eq!(listed[1].agent_id, None);
        assert!(!listed[1].completed);

        assert!(matches!(
            store.create_subtask(NewSubTask::new(404, "Orphan")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = format!("sqlite://{}", dir.path().join("orcas.db").display());

        let space_id = {
            let store = SqliteStore::new(&path).await.unwrap();
            store.create_space("Persisted", None).await.unwrap().id
        };

        let store = SqliteStore::new(&path).await.unwrap();
        assert_eq!(
            store.get_space(space_id).await.unwrap().unwrap().title,
            "Persisted"
        );
    }
}
