//! End-to-end integration tests for the Orcas chat turn engine.
//!
//! These tests drive whole turns from user input to assembled answer through
//! a scripted provider, the real workspace tool registry, and the in-memory
//! store: tool dispatch, result feedback, citations, and workspace effects.
//! Task planning runs the same way through its own tool registry.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use orcas_agent::{
    ChatTurnConfig, ChatTurnEngine, PlanningObserver, PlanningProgress, TaskPlanner, TurnEvent,
    TurnObserver, TurnOptions,
};
use orcas_core::error::ProviderError;
use orcas_core::message::{Citation, ContentBlock, Message, MessageContent};
use orcas_core::provider::{Provider, ProviderRequest, ProviderResponse, StopReason, Usage};
use orcas_core::store::{AgentProfile, PLANNING_ROLE, Space, Task, TaskStatus, WorkspaceStore};
use orcas_core::tool::{ToolContext, ToolHooks};
use orcas_store::{InMemoryStore, UnavailableCalendar};
use orcas_tools::{WorkspaceToolExecutor, default_registry};
use serde_json::json;
use tokio_util::sync::CancellationToken;

// ── Scripted provider ────────────────────────────────────────────────────

/// A provider that replays responses in order and records every request.
struct ScriptedProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Tool results sent back in request `index`.
    fn tool_results(&self, index: usize) -> Vec<(String, String, bool)> {
        let request = &self.requests()[index];
        let Some(last) = request.messages.last() else {
            return Vec::new();
        };
        match &last.content {
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => Some((
                        tool_use_id.clone(),
                        content.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n"),
                        *is_error,
                    )),
                    _ => None,
                })
                .collect(),
            MessageContent::Text(_) => Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => Ok(response),
            None => panic!("ScriptedProvider exhausted"),
        }
    }
}

fn respond(stop_reason: StopReason, content: Vec<ContentBlock>) -> ProviderResponse {
    ProviderResponse {
        content,
        stop_reason,
        usage: Usage {
            input_tokens: 50,
            output_tokens: 5,
        },
        model: "claude-sonnet-4-20250514".into(),
    }
}

fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.into(),
        name: name.into(),
        input,
    }
}

// ── Workspace fixture ────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingHooks {
    notes_read: Mutex<Vec<i64>>,
    contexts_updated: Mutex<Vec<(i64, String)>>,
}

impl ToolHooks for RecordingHooks {
    fn on_task_notes_read(&self, task_id: i64, _content: &str) {
        self.notes_read.lock().unwrap().push(task_id);
    }

    fn on_space_context_updated(&self, space_id: i64, content: &str) {
        self.contexts_updated
            .lock()
            .unwrap()
            .push((space_id, content.to_string()));
    }
}

struct Workspace {
    store: Arc<InMemoryStore>,
    hooks: Arc<RecordingHooks>,
    executor: Arc<WorkspaceToolExecutor>,
    schemas: Vec<orcas_core::tool::ToolSchema>,
}

async fn workspace(context: ToolContext) -> Workspace {
    let store = Arc::new(InMemoryStore::new());
    store
        .put_space(Space {
            id: 1,
            title: "Launch".into(),
            description: None,
            context_markdown: "# Launch\nShip v2 in March.".into(),
        })
        .await;
    store
        .put_task(Task {
            id: 7,
            space_id: 1,
            title: "Draft announcement".into(),
            description: Some("Blog post for v2".into()),
            status: TaskStatus::InProgress,
            priority: "high".into(),
            due_date: Some("2026-03-01".into()),
            scheduled_date: None,
        })
        .await;

    let hooks = Arc::new(RecordingHooks::default());
    let registry = Arc::new(default_registry(
        store.clone(),
        Arc::new(UnavailableCalendar::new("calendar permission denied")),
    ));
    let schemas = registry.schemas();
    let executor = Arc::new(WorkspaceToolExecutor::new(
        registry,
        context.with_hooks(hooks.clone()),
    ));

    Workspace {
        store,
        hooks,
        executor,
        schemas,
    }
}

fn turn_config(ws: &Workspace) -> ChatTurnConfig {
    ChatTurnConfig::new("claude-sonnet-4-20250514", "You help the user manage tasks.")
        .with_tools(ws.schemas.clone())
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn write_then_read_notes_across_rounds() {
    let ws = workspace(ToolContext::new().with_task(7)).await;
    let provider = ScriptedProvider::new(vec![
        respond(
            StopReason::ToolUse,
            vec![
                ContentBlock::text("I'll save that."),
                tool_use("toolu_1", "write_task_notes", json!({"content": "Outline: intro, features"})),
            ],
        ),
        respond(
            StopReason::ToolUse,
            vec![tool_use("toolu_2", "read_task_notes", json!({}))],
        ),
        respond(StopReason::EndTurn, vec![ContentBlock::text("Notes saved and verified.")]),
    ]);

    let outcome = ChatTurnEngine::new(provider.clone())
        .send_chat_turn(
            &turn_config(&ws),
            &[Message::user("Save an outline to the task notes")],
            TurnOptions::new().with_executor(ws.executor.clone()),
        )
        .await
        .unwrap();

    assert_eq!(outcome.rounds, 3);
    assert_eq!(outcome.input_tokens, 150);
    assert_eq!(outcome.output_tokens, 15);
    assert!(outcome.content.ends_with("Notes saved and verified."));

    assert_eq!(
        ws.store.read_task_notes(7).await.unwrap(),
        "Outline: intro, features"
    );
    assert_eq!(*ws.hooks.notes_read.lock().unwrap(), vec![7]);

    let read_back = provider.tool_results(2);
    assert_eq!(
        read_back,
        vec![("toolu_2".to_string(), "Outline: intro, features".to_string(), false)]
    );

    // Every request advertises the full tool catalog.
    for request in provider.requests() {
        assert_eq!(request.tools.len(), 9);
    }
}

#[tokio::test]
async fn tool_failures_are_fed_back_not_raised() {
    let ws = workspace(ToolContext::new()).await;
    let provider = ScriptedProvider::new(vec![
        respond(
            StopReason::ToolUse,
            vec![
                tool_use("toolu_a", "delete_space", json!({"space_id": 1})),
                tool_use("toolu_b", "read_task_notes", json!({})),
                tool_use("toolu_c", "get_task_details", json!({"task_id": "7"})),
            ],
        ),
        respond(StopReason::EndTurn, vec![ContentBlock::text("Which task did you mean?")]),
    ]);

    let outcome = ChatTurnEngine::new(provider.clone())
        .send_chat_turn(
            &turn_config(&ws),
            &[Message::user("Clean up")],
            TurnOptions::new().with_executor(ws.executor.clone()),
        )
        .await
        .unwrap();

    assert!(outcome.content.ends_with("Which task did you mean?"));

    let results = provider.tool_results(1);
    assert_eq!(results.len(), 3);

    let (id, text, is_error) = &results[0];
    assert_eq!(id, "toolu_a");
    assert!(*is_error);
    assert!(text.contains("delete_space"));

    let (id, text, is_error) = &results[1];
    assert_eq!(id, "toolu_b");
    assert!(*is_error);
    assert!(text.contains("task_id"));

    let (id, text, is_error) = &results[2];
    assert_eq!(id, "toolu_c");
    assert!(!is_error);
    assert!(text.contains("Draft announcement"));
}

#[tokio::test]
async fn calendar_outage_degrades_to_text() {
    let ws = workspace(ToolContext::new()).await;
    let provider = ScriptedProvider::new(vec![
        respond(
            StopReason::ToolUse,
            vec![tool_use("toolu_cal", "get_calendar_events", json!({"date": "2026-03-02"}))],
        ),
        respond(StopReason::EndTurn, vec![ContentBlock::text("Your calendar is unavailable.")]),
    ]);

    ChatTurnEngine::new(provider.clone())
        .send_chat_turn(
            &turn_config(&ws),
            &[Message::user("What's on Monday?")],
            TurnOptions::new().with_executor(ws.executor.clone()),
        )
        .await
        .unwrap();

    let (_, text, is_error) = &provider.tool_results(1)[0];
    assert!(!is_error);
    assert!(text.contains("not available"));
    assert!(text.contains("calendar permission denied"));
}

#[tokio::test]
async fn space_context_update_fires_hook() {
    let ws = workspace(ToolContext::new().with_space(1)).await;
    let provider = ScriptedProvider::new(vec![
        respond(
            StopReason::ToolUse,
            vec![tool_use(
                "toolu_ctx",
                "update_space_context",
                json!({"content": "# Launch\nShip v2 in April."}),
            )],
        ),
        respond(StopReason::EndTurn, vec![ContentBlock::text("Updated the launch date.")]),
    ]);

    ChatTurnEngine::new(provider)
        .send_chat_turn(
            &turn_config(&ws),
            &[Message::user("We slipped to April")],
            TurnOptions::new().with_executor(ws.executor.clone()),
        )
        .await
        .unwrap();

    assert_eq!(
        ws.store.read_space_context(1).await.unwrap(),
        "# Launch\nShip v2 in April."
    );
    assert_eq!(
        *ws.hooks.contexts_updated.lock().unwrap(),
        vec![(1, "# Launch\nShip v2 in April.".to_string())]
    );
}

#[tokio::test]
async fn final_answer_lists_sources_once() {
    let ws = workspace(ToolContext::new()).await;
    let cite = |url: &str, title: &str| Citation {
        url: Some(url.into()),
        title: Some(title.into()),
        extra: serde_json::Map::new(),
    };
    let provider = ScriptedProvider::new(vec![respond(
        StopReason::EndTurn,
        vec![
            ContentBlock::Text {
                text: "Rust 2024 is stable. ".into(),
                citations: vec![cite("https://blog.rust-lang.org/", "Rust Blog")],
            },
            ContentBlock::Text {
                text: "It shipped with 1.85.".into(),
                citations: vec![cite("https://blog.rust-lang.org/", "Announcing Rust 1.85")],
            },
        ],
    )]);

    let outcome = ChatTurnEngine::new(provider)
        .send_chat_turn(&turn_config(&ws), &[Message::user("Is Rust 2024 out?")], TurnOptions::new())
        .await
        .unwrap();

    assert_eq!(
        outcome.content,
        "Rust 2024 is stable. It shipped with 1.85.\n\n**Sources:**\n- [Rust Blog](https://blog.rust-lang.org/)\n"
    );
}

#[tokio::test]
async fn observer_sees_ordered_progress() {
    let ws = workspace(ToolContext::new().with_task(7)).await;
    let provider = ScriptedProvider::new(vec![
        respond(
            StopReason::ToolUse,
            vec![tool_use("toolu_1", "check_task_notes", json!({}))],
        ),
        respond(StopReason::EndTurn, vec![ContentBlock::text("No notes yet.")]),
    ]);

    let events = Arc::new(Mutex::new(Vec::<TurnEvent>::new()));
    let sink = events.clone();
    let observer: Arc<dyn TurnObserver> = Arc::new(move |e: &TurnEvent| sink.lock().unwrap().push(e.clone()));

    let outcome = ChatTurnEngine::new(provider)
        .send_chat_turn(
            &turn_config(&ws),
            &[Message::user("Any notes?")],
            TurnOptions::new()
                .with_executor(ws.executor.clone())
                .with_observer(observer),
        )
        .await
        .unwrap();

    let events = events.lock().unwrap();
    let kinds: Vec<&str> = events.iter().map(TurnEvent::event_type).collect();
    assert_eq!(
        kinds,
        vec!["content", "tool_call", "tool_result", "content", "content", "done"]
    );
    match events.last() {
        Some(TurnEvent::Done { rounds, .. }) => assert_eq!(*rounds, 2),
        other => panic!("expected done, got {other:?}"),
    }
    match &events[4] {
        TurnEvent::Content { content } => assert_eq!(content, &outcome.content),
        other => panic!("expected content, got {other:?}"),
    }
}

#[tokio::test]
async fn planning_turn_writes_assigned_subtasks() {
    let ws = workspace(ToolContext::new()).await;
    for (id, name, role) in [(1, "Planner", Some(PLANNING_ROLE)), (2, "Copywriter", None), (3, "Designer", None)] {
        ws.store
            .put_agent(AgentProfile {
                id,
                name: name.into(),
                model_name: "claude-sonnet-4-20250514".into(),
                agent_prompt: format!("{name} instructions"),
                system_role: role.map(str::to_string),
            })
            .await;
    }
    // Models sometimes send ids as strings.
    let provider = ScriptedProvider::new(vec![
        respond(
            StopReason::ToolUse,
            vec![
                tool_use("toolu_1", "create_subtask", json!({"title": "Write post", "description": "Draft the blog post", "agent_id": "2"})),
                tool_use("toolu_2", "create_subtask", json!({"title": "Hero image", "description": "Design the header", "agent_id": 3})),
            ],
        ),
        respond(StopReason::EndTurn, vec![ContentBlock::text("Two subtasks created.")]),
    ]);

    let progress = Arc::new(Mutex::new(Vec::<PlanningProgress>::new()));
    let sink = progress.clone();
    let observer: Arc<dyn PlanningObserver> = Arc::new(move |p: &PlanningProgress| sink.lock().unwrap().push(p.clone()));

    let outcome = TaskPlanner::new(ChatTurnEngine::new(provider.clone()), ws.store.clone(), "claude-sonnet-4")
        .plan_task_with_fallback(7, observer, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.subtasks_created, 2);
    assert!(!outcome.used_fallback);

    let subtasks = ws.store.list_subtasks(7).await.unwrap();
    let assigned: Vec<_> = subtasks.iter().map(|s| (s.title.as_str(), s.agent_id)).collect();
    assert_eq!(assigned, vec![("Write post", Some(2)), ("Hero image", Some(3))]);

    let results = provider.tool_results(1);
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(_, _, is_error)| !is_error));
    assert_eq!(results[0].1, "Successfully created subtask: 'Write post'");

    // Planning never advertises the chat tools.
    assert_eq!(provider.requests()[0].tools.len(), 1);

    let progress = progress.lock().unwrap();
    assert!(progress.windows(2).all(|w| w[0].progress <= w[1].progress));
    assert_eq!(progress.last().map(|p| p.progress), Some(0.9));
}
