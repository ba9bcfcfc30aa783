//! Task planning: break a task into subtasks assigned to the user's agents.
//!
//! The planning agent runs one chat turn whose only tool is `create_subtask`,
//! so the turn engine supplies the round limit, retry, and tool-result
//! feedback. When that turn fails, [`TaskPlanner::plan_task_with_fallback`]
//! creates a generic three-step plan instead, assigning the steps to user
//! agents round-robin.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use orcas_core::message::Message;
use orcas_core::store::{AgentProfile, NewSubTask, PLANNING_ROLE, Task, WorkspaceStore};
use orcas_core::tool::{ToolContext, ToolRegistry};
use orcas_tools::{WorkspaceToolExecutor, planning_registry};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{ChatTurnConfig, ChatTurnEngine, TurnOptions};
use crate::error::PlanningError;
use crate::stream_event::{TurnEvent, TurnObserver};

/// Model round trips a planning turn may take.
pub const MAX_PLANNING_ROUNDS: u32 = 20;

const PLANNING_MAX_TOKENS: u32 = 4096;

const CREATE_SUBTASK: &str = "create_subtask";

/// Used when the workspace has no planning agent configured.
pub const DEFAULT_PLANNING_PROMPT: &str = "You are a planning agent. You break a task into \
    concrete subtasks and assign each one to the agent whose capabilities fit it best.";

const PLANNING_REQUEST: &str = "Please analyze this task and create a comprehensive breakdown \
    using the create_subtask tool. Create 3-7 subtasks that cover the complete workflow, and \
    assign each to the most appropriate agent.";

const FALLBACK_SUBTASKS: [(&str, &str); 3] = [
    (
        "Research and plan approach",
        "Gather requirements, research best practices, and develop a comprehensive execution plan",
    ),
    (
        "Execute primary deliverables",
        "Complete the main task deliverables according to the researched plan and requirements",
    ),
    (
        "Review and finalize output",
        "Quality check, refinements, and final validation of deliverables",
    ),
];

/// Where a planning run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningStage {
    Analyzing,
    Planning,
    Creating,
    Finalizing,
    Fallback,
    FallbackCreating,
}

/// A progress report from a planning run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanningProgress {
    pub task_id: i64,
    pub stage: PlanningStage,
    pub message: String,
    /// Fraction complete, in `0.0..=1.0`
    pub progress: f32,
    pub current_step: &'static str,
}

/// Receives [`PlanningProgress`] reports as planning runs.
pub trait PlanningObserver: Send + Sync {
    fn on_progress(&self, progress: &PlanningProgress);
}

impl<F> PlanningObserver for F
where
    F: Fn(&PlanningProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &PlanningProgress) {
        self(progress)
    }
}

/// The result of planning a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanningOutcome {
    pub subtasks_created: u32,
    /// Set when the generic plan replaced a failed planning turn
    pub used_fallback: bool,
    pub message: String,
}

/// Plans tasks into subtasks using the workspace's planning agent.
pub struct TaskPlanner {
    /// Runs the planning turn, capped at [`MAX_PLANNING_ROUNDS`]
    engine: ChatTurnEngine,
    /// Source of tasks and agents; subtasks are written here
    store: Arc<dyn WorkspaceStore>,
    /// Holds only `create_subtask`
    tools: Arc<ToolRegistry>,
    /// Model used when no planning agent is configured
    default_model: String,
}

impl TaskPlanner {
    pub fn new(engine: ChatTurnEngine, store: Arc<dyn WorkspaceStore>, default_model: impl Into<String>) -> Self {
        Self {
            engine: engine.with_max_rounds(MAX_PLANNING_ROUNDS),
            tools: Arc::new(planning_registry(store.clone())),
            store,
            default_model: default_model.into(),
        }
    }

    /// Plan `task_id` with the planning agent.
    pub async fn plan_task(
        &self,
        task_id: i64,
        observer: Arc<dyn PlanningObserver>,
        cancel: CancellationToken,
    ) -> Result<PlanningOutcome, PlanningError> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(PlanningError::TaskNotFound(task_id))?;

        report(
            observer.as_ref(),
            task_id,
            PlanningStage::Analyzing,
            "Initializing AI planning agent...",
            0.1,
            "Initialization",
        );

        let (model, prompt) = match self.store.system_agent(PLANNING_ROLE).await? {
            Some(planner) => (planner.model_name, planner.agent_prompt),
            None => {
                debug!("No planning agent configured, using the default prompt");
                (self.default_model.clone(), DEFAULT_PLANNING_PROMPT.to_string())
            }
        };
        let agents = self.store.list_agents().await?;
        let config = ChatTurnConfig::new(model, planning_system_prompt(&prompt, &task, &agents))
            .with_tools(self.tools.schemas())
            .with_max_tokens(PLANNING_MAX_TOKENS);

        report(
            observer.as_ref(),
            task_id,
            PlanningStage::Planning,
            "AI agent analyzing task...",
            0.2,
            "Analysis",
        );

        let tally = Arc::new(SubtaskTally {
            task_id,
            created: AtomicU32::new(0),
            observer: observer.clone(),
        });
        let executor = WorkspaceToolExecutor::new(self.tools.clone(), ToolContext::new().with_task(task_id));
        let options = TurnOptions::new()
            .with_executor(Arc::new(executor))
            .with_observer(tally.clone())
            .with_cancel(cancel);

        let outcome = self
            .engine
            .send_chat_turn(&config, &[Message::user(PLANNING_REQUEST)], options)
            .await?;
        debug!(task_id, rounds = outcome.rounds, summary = %outcome.content, "Planning turn finished");

        report(
            observer.as_ref(),
            task_id,
            PlanningStage::Finalizing,
            "Planning complete, generating summary...",
            0.9,
            "Finalization",
        );

        let created = tally.created.load(Ordering::SeqCst);
        info!(task_id, subtasks = created, "Task planned");
        Ok(PlanningOutcome {
            subtasks_created: created,
            used_fallback: false,
            message: format!("Successfully created {created} subtasks using AI planning agent"),
        })
    }

    /// Plan `task_id`, falling back to a generic plan when the planning turn fails.
    pub async fn plan_task_with_fallback(
        &self,
        task_id: i64,
        observer: Arc<dyn PlanningObserver>,
        cancel: CancellationToken,
    ) -> Result<PlanningOutcome, PlanningError> {
        match self.plan_task(task_id, observer.clone(), cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.allows_fallback() => {
                warn!(task_id, error = %e, "AI planning failed, using fallback plan");
                report(
                    observer.as_ref(),
                    task_id,
                    PlanningStage::Fallback,
                    "AI planning unavailable, using fallback...",
                    0.3,
                    "Fallback",
                );
                self.fallback_plan(task_id, observer.as_ref()).await
            }
            Err(e) => Err(e),
        }
    }

    async fn fallback_plan(
        &self,
        task_id: i64,
        observer: &dyn PlanningObserver,
    ) -> Result<PlanningOutcome, PlanningError> {
        let agents = self.store.list_agents().await?;
        if agents.is_empty() {
            return Err(PlanningError::NoAgents);
        }

        let total = FALLBACK_SUBTASKS.len() as u32;
        let mut created = 0;
        for (index, (title, description)) in FALLBACK_SUBTASKS.iter().enumerate() {
            let agent = &agents[index % agents.len()];
            self.store
                .create_subtask(
                    NewSubTask::new(task_id, *title)
                        .with_description(*description)
                        .with_agent(agent.id),
                )
                .await?;
            created += 1;

            report(
                observer,
                task_id,
                PlanningStage::FallbackCreating,
                &format!("Fallback: Created subtask {created}/{total}"),
                0.3 + 0.5 * (created as f32 / total as f32),
                "Fallback Planning",
            );
        }

        info!(task_id, subtasks = created, "Task planned with fallback");
        Ok(PlanningOutcome {
            subtasks_created: created,
            used_fallback: true,
            message: format!("Created {created} subtasks using fallback planning (AI agent unavailable)"),
        })
    }
}

/// Counts successful `create_subtask` results and reports each one.
struct SubtaskTally {
    task_id: i64,
    created: AtomicU32,
    observer: Arc<dyn PlanningObserver>,
}

impl TurnObserver for SubtaskTally {
    fn on_event(&self, event: &TurnEvent) {
        match event {
            TurnEvent::ToolResult { name, is_error, .. } if name == CREATE_SUBTASK && !is_error => {
                let created = self.created.fetch_add(1, Ordering::SeqCst) + 1;
                report(
                    self.observer.as_ref(),
                    self.task_id,
                    PlanningStage::Creating,
                    &format!("Created subtask {created} of estimated 3-7..."),
                    0.2 + (0.6 * (created as f32 / 5.0)).min(0.6),
                    "Subtask Creation",
                );
            }
            _ => {}
        }
    }
}

fn report(
    observer: &dyn PlanningObserver,
    task_id: i64,
    stage: PlanningStage,
    message: &str,
    progress: f32,
    current_step: &'static str,
) {
    observer.on_progress(&PlanningProgress {
        task_id,
        stage,
        message: message.to_string(),
        progress: progress.clamp(0.0, 1.0),
        current_step,
    });
}

/// The planning agent's prompt followed by the task and the agents it may assign.
fn planning_system_prompt(agent_prompt: &str, task: &Task, agents: &[AgentProfile]) -> String {
    let mut roster = String::new();
    for agent in agents {
        let _ = writeln!(
            roster,
            "**Agent ID {}: {} (Model: {})**\n{}\n",
            agent.id, agent.name, agent.model_name, agent.agent_prompt
        );
    }
    if roster.is_empty() {
        roster.push_str("No agents are configured.\n");
    }

    format!(
        "{agent_prompt}\n\n## Current Planning Task\n\n**Task ID**: {}\n**Title**: {}\n**Description**: {}\n\n\
         ## Available Agents for Assignment\n\n{}\n\n## Instructions\n\n\
         Analyze this task and create appropriate subtasks using the create_subtask tool. Each subtask \
         should have a clear title, detailed description, and be assigned to the most suitable agent \
         based on their capabilities.",
        task.id,
        task.title,
        task.description.as_deref().unwrap_or("No description provided"),
        roster.trim_end(),
    )
}
