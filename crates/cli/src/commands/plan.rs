//! `orcas plan`: break a task into subtasks assigned to agents.

use std::sync::Arc;

use orcas_agent::{ChatTurnEngine, PlanningObserver, PlanningProgress, TaskPlanner};
use orcas_core::store::WorkspaceStore;
use orcas_providers::models::resolve_with_provider;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn run(task_id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let provider = orcas_providers::build_from_config(&config)?;
    let model = resolve_with_provider(provider.as_ref(), &config.default_model).await;

    let store: Arc<dyn WorkspaceStore> = Arc::new(super::open_store(&config).await?);
    let task = store
        .get_task(task_id)
        .await?
        .ok_or_else(|| format!("Task {task_id} not found"))?;
    println!();
    println!("  Planning task #{}: {}", task.id, task.title);
    println!();

    let engine = ChatTurnEngine::from_config(provider, &config);
    let planner = TaskPlanner::new(engine, store.clone(), model);
    let printer: Arc<dyn PlanningObserver> = Arc::new(print_progress);

    let cancel = CancellationToken::new();
    let result = {
        let plan = planner.plan_task_with_fallback(task_id, printer, cancel.clone());
        tokio::pin!(plan);

        tokio::select! {
            result = &mut plan => result,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                plan.await
            }
        }
    };
    let outcome = result?;
    info!(task_id, subtasks = outcome.subtasks_created, fallback = outcome.used_fallback, "Plan finished");

    let agents = store.list_agents().await?;
    let subtasks = store.list_subtasks(task_id).await?;
    println!();
    println!("  {}", outcome.message);
    println!();
    for subtask in &subtasks {
        let assignee = subtask
            .agent_id
            .and_then(|id| agents.iter().find(|a| a.id == id))
            .map(|a| a.name.as_str())
            .unwrap_or("unassigned");
        println!("  {:>4}. {} [{assignee}]", subtask.id, subtask.title);
        if let Some(description) = &subtask.description {
            println!("        {description}");
        }
    }
    println!();
    Ok(())
}

fn print_progress(progress: &PlanningProgress) {
    println!(
        "  [{:>3.0}%] {}",
        progress.progress * 100.0,
        progress.message
    );
}
