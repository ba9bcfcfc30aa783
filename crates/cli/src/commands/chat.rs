//! `orcas chat`: interactive or single-message chat.

use std::io::Write;
use std::sync::{Arc, Mutex};

use orcas_agent::{ChatTurnConfig, ChatTurnEngine, TurnError, TurnEvent, TurnObserver, TurnOptions};
use orcas_core::message::Message;
use orcas_core::tool::{ToolContext, ToolHooks};
use orcas_providers::models::resolve_with_provider;
use orcas_store::UnavailableCalendar;
use orcas_tools::{WorkspaceToolExecutor, default_registry};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct ChatArgs {
    pub message: Option<String>,
    pub task: Option<i64>,
    pub space: Option<i64>,
    pub model: Option<String>,
}

pub async fn run(args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    // Check for API key early, with a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    ORCAS_API_KEY=...");
        eprintln!("    {}=...", config.provider.api_key_env());
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!("    {}", orcas_config::AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = orcas_providers::build_from_config(&config)?;
    let requested = args.model.as_deref().unwrap_or(&config.default_model);
    let model = resolve_with_provider(provider.as_ref(), requested).await;

    let store = Arc::new(super::open_store(&config).await?);
    let calendar = Arc::new(UnavailableCalendar::new(
        "calendar access is not available from the command line",
    ));
    let registry = Arc::new(default_registry(store, calendar));

    let mut context = ToolContext::new().with_hooks(Arc::new(LoggingHooks));
    if let Some(task_id) = args.task {
        context = context.with_task(task_id);
    }
    if let Some(space_id) = args.space {
        context = context.with_space(space_id);
    }
    let executor = Arc::new(WorkspaceToolExecutor::new(registry.clone(), context));

    let mut turn_config = ChatTurnConfig::from_app_config(&config, &model).with_tools(registry.schemas());
    // `[models.<name>]` may be keyed by the friendly name rather than the snapshot id.
    if turn_config.max_tokens.is_none() {
        turn_config.max_tokens = config.max_tokens_for(requested);
    }
    let engine = ChatTurnEngine::from_config(provider, &config);

    let session = Session {
        engine,
        turn_config,
        executor,
    };

    if let Some(message) = args.message {
        // Single message mode
        let mut history = vec![Message::user(message)];
        session.turn(&mut history).await?;
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Orcas: interactive chat");
    println!();
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {model}");
    println!("  Tools:     {}", registry.names().join(", "));
    if let Some(task_id) = args.task {
        println!("  Task:      #{task_id}");
    }
    if let Some(space_id) = args.space {
        println!("  Space:     #{space_id}");
    }
    println!();
    println!("  Type your message and press Enter.");
    println!("  Ctrl+C cancels a running reply; type 'exit' or press Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history = Vec::new();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        history.push(Message::user(line));
        match session.turn(&mut history).await {
            Ok(()) => {}
            Err(TurnError::Cancelled) => {
                eprintln!("  [Cancelled]");
                history.pop();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                history.pop();
            }
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

struct Session {
    engine: ChatTurnEngine,
    turn_config: ChatTurnConfig,
    executor: Arc<WorkspaceToolExecutor>,
}

impl Session {
    /// Run one turn over `history`, streaming progress to the terminal.
    ///
    /// On success the assistant's answer is appended to `history`.
    async fn turn(&self, history: &mut Vec<Message>) -> Result<(), TurnError> {
        let cancel = CancellationToken::new();
        let printer = Arc::new(TerminalPrinter::default());
        let options = TurnOptions::new()
            .with_executor(self.executor.clone())
            .with_observer(printer.clone())
            .with_cancel(cancel.clone());

        let result = {
            let turn = self.engine.send_chat_turn(&self.turn_config, history.as_slice(), options);
            tokio::pin!(turn);

            tokio::select! {
                result = &mut turn => result,
                _ = tokio::signal::ctrl_c() => {
                    cancel.cancel();
                    Err(TurnError::Cancelled)
                }
            }
        };
        println!();

        let outcome = result?;
        info!(
            rounds = outcome.rounds,
            input_tokens = outcome.input_tokens,
            output_tokens = outcome.output_tokens,
            "Turn finished"
        );
        history.push(Message::assistant(outcome.content));
        Ok(())
    }
}

/// Prints content as it grows; retries go to stderr.
#[derive(Default)]
struct TerminalPrinter {
    shown: Mutex<String>,
}

impl TurnObserver for TerminalPrinter {
    fn on_event(&self, event: &TurnEvent) {
        match event {
            TurnEvent::Content { content } => {
                let Ok(mut shown) = self.shown.lock() else {
                    return;
                };
                print!("{}", unseen_suffix(&shown, content));
                let _ = std::io::stdout().flush();
                *shown = content.clone();
            }
            TurnEvent::Retry {
                attempt, delay_ms, error, ..
            } => {
                eprintln!("\n  [Retry {attempt}] {error}; waiting {delay_ms} ms");
            }
            TurnEvent::ToolCall { .. } | TurnEvent::ToolResult { .. } | TurnEvent::Done { .. } => {}
        }
    }
}

/// The part of `content` past what is already on screen.
///
/// Content normally only grows. When the final answer is truncated it can
/// diverge from what was streamed; only the text after the shared prefix
/// (usually just the truncation marker) is returned.
fn unseen_suffix<'a>(shown: &str, content: &'a str) -> &'a str {
    let common = shown
        .char_indices()
        .zip(content.chars())
        .find(|((_, a), b)| a != b)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| shown.len().min(content.len()));
    &content[common..]
}

/// Reports workspace side effects through the log.
struct LoggingHooks;

impl ToolHooks for LoggingHooks {
    fn on_task_notes_read(&self, task_id: i64, content: &str) {
        info!(task_id, chars = content.len(), "Task notes read");
    }

    fn on_space_context_updated(&self, space_id: i64, content: &str) {
        info!(space_id, chars = content.len(), "Space context updated");
    }
}
