//! The chat turn engine: drives one exchange with the model to completion.
//!
//! A turn is a loop over model round trips:
//! 1. Compact the caller's history once, up front.
//! 2. Call the provider (with retry) using the running conversation.
//! 3. On `tool_use`: run each requested tool in order, append the assistant
//!    message and a user message carrying the tool results, and loop.
//! 4. On `pause_turn`: append the assistant message and loop.
//! 5. Anything else ends the turn: assemble the final answer and return.
//!
//! The loop is bounded by `max_rounds`; cancellation is checked at the top
//! of each round and during retry backoff.

use std::sync::Arc;

use orcas_config::AppConfig;
use orcas_core::error::ProviderError;
use orcas_core::message::{ContentBlock, Message};
use orcas_core::provider::{Provider, ProviderRequest, StopReason};
use orcas_core::tool::{ToolCall, ToolExecutor, ToolResult, ToolSchema};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::assembler::{ResponseAssembler, UsageTotals, append_segment};
use crate::compaction::{CompactionPolicy, compact};
use crate::error::TurnError;
use crate::retry::{RetryError, RetryExecutor, RetryPolicy};
use crate::stream_event::{TurnEvent, TurnObserver};

/// Characters of tool output shown in the progress transcript.
const TOOL_PREVIEW_CHARS: usize = 200;

/// Returned to the model when a turn has tools but nothing to run them.
const NO_EXECUTOR_MESSAGE: &str = "Tool execution not available";

/// Per-turn model parameters.
#[derive(Debug, Clone)]
pub struct ChatTurnConfig {
    /// Model id sent to the provider
    pub model: String,
    /// System prompt; omitted from the request when empty
    pub system_prompt: String,
    /// Tool schemas advertised on every round
    pub tools: Vec<ToolSchema>,
    /// Per-request key overriding the provider's configured one
    pub api_key: Option<String>,
    /// Output-token limit; `None` uses the model-family default
    pub max_tokens: Option<u32>,
}

impl ChatTurnConfig {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            tools: Vec::new(),
            api_key: None,
            max_tokens: None,
        }
    }

    /// Build from application config for `model`, using its per-model override.
    pub fn from_app_config(config: &AppConfig, model: &str) -> Self {
        Self {
            model: model.to_string(),
            system_prompt: config.system_prompt.clone(),
            tools: Vec::new(),
            api_key: None,
            max_tokens: config.max_tokens_for(model),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// The explicit override, else the default for the model family.
    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens
            .unwrap_or_else(|| default_max_tokens(&self.model))
    }
}

/// Default output-token limit by model family.
pub fn default_max_tokens(model: &str) -> u32 {
    let model = model.to_ascii_lowercase();
    if model.contains("opus") {
        32_000
    } else if model.contains("sonnet") {
        64_000
    } else if model.contains("haiku") {
        8_192
    } else {
        4_096
    }
}

/// Caller-side hooks for one turn.
#[derive(Clone, Default)]
pub struct TurnOptions {
    /// Receives progress events as the turn runs
    pub observer: Option<Arc<dyn TurnObserver>>,
    /// Runs requested tools; without one every call gets an error result
    pub executor: Option<Arc<dyn ToolExecutor>>,
    /// Cancels the turn between rounds and during retry backoff
    pub cancel: CancellationToken,
}

impl TurnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn emit(&self, event: TurnEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }
}

/// The result of a completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The assembled answer, including the progress transcript
    pub content: String,
    /// Input tokens summed over every round
    pub input_tokens: u64,
    /// Output tokens summed over every round
    pub output_tokens: u64,
    /// Model round trips taken
    pub rounds: u32,
}

/// Drives chat turns against one provider.
///
/// The engine holds no per-turn state; concurrent turns may share it.
pub struct ChatTurnEngine {
    /// The LLM provider
    provider: Arc<dyn Provider>,
    /// Retries transient provider failures
    retry: RetryExecutor,
    /// Budget applied to the caller's history
    compaction: CompactionPolicy,
    /// Builds the final answer
    assembler: ResponseAssembler,
    /// Maximum model round trips per turn
    max_rounds: u32,
}

impl ChatTurnEngine {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            retry: RetryExecutor::default(),
            compaction: CompactionPolicy::default(),
            assembler: ResponseAssembler::default(),
            max_rounds: 25,
        }
    }

    /// Build an engine using the retry, compaction and turn limits from `config`.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider)
            .with_retry(RetryPolicy::from(&config.retry))
            .with_compaction(CompactionPolicy::from(&config.compaction))
            .with_max_rounds(config.turn.max_rounds)
            .with_max_output_chars(config.turn.max_output_chars)
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        self
    }

    pub fn with_compaction(mut self, policy: CompactionPolicy) -> Self {
        self.compaction = policy;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_max_output_chars(mut self, max_output_chars: usize) -> Self {
        self.assembler = ResponseAssembler::new(max_output_chars);
        self
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Run one turn over `history` and return the assembled answer.
    pub async fn send_chat_turn(
        &self,
        config: &ChatTurnConfig,
        history: &[Message],
        options: TurnOptions,
    ) -> Result<TurnOutcome, TurnError> {
        let turn_id = Uuid::new_v4();
        let span = info_span!(
            "chat_turn",
            %turn_id,
            provider = self.provider.name(),
            model = %config.model
        );
        self.run_turn(turn_id, config, history, &options)
            .instrument(span)
            .await
    }

    async fn run_turn(
        &self,
        turn_id: Uuid,
        config: &ChatTurnConfig,
        history: &[Message],
        options: &TurnOptions,
    ) -> Result<TurnOutcome, TurnError> {
        let mut conversation = compact(history, &self.compaction);
        let mut content = String::new();
        let mut usage = UsageTotals::default();
        let max_tokens = config.effective_max_tokens();

        info!(
            history = history.len(),
            sent = conversation.len(),
            tools = config.tools.len(),
            max_tokens,
            "Starting chat turn"
        );

        for round in 1..=self.max_rounds {
            if options.cancel.is_cancelled() {
                info!(round, "Turn cancelled");
                return Err(TurnError::Cancelled);
            }

            let request = ProviderRequest {
                model: config.model.clone(),
                messages: conversation.clone(),
                system: Some(config.system_prompt.clone()).filter(|s| !s.is_empty()),
                max_tokens,
                tools: config.tools.clone(),
                api_key: config.api_key.clone(),
            };

            let response = self
                .retry
                .run(
                    &options.cancel,
                    |attempt, err: &ProviderError, delay| {
                        options.emit(TurnEvent::Retry {
                            attempt,
                            delay_ms: delay.as_millis() as u64,
                            error: err.to_string(),
                        })
                    },
                    || self.provider.complete(request.clone()),
                )
                .await
                .map_err(|e| match e {
                    RetryError::Cancelled => TurnError::Cancelled,
                    RetryError::Failed(err) => TurnError::Provider(err),
                })?;

            usage.add(&response.usage);
            debug!(
                round,
                stop_reason = ?response.stop_reason,
                blocks = response.content.len(),
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Model responded"
            );

            let calls = tool_calls(&response.content);
            match response.stop_reason {
                StopReason::ToolUse if !calls.is_empty() => {
                    self.push_content(&mut content, &response.text(), options);

                    let mut results = Vec::with_capacity(calls.len());
                    for call in &calls {
                        let result = self.run_tool(call, &mut content, options).await;
                        results.push(result.into_block(call.id.clone()));
                    }

                    conversation.push(Message::assistant_blocks(response.content));
                    conversation.push(Message::tool_results(results));
                }
                StopReason::PauseTurn => {
                    debug!(round, "Model paused; continuing");
                    self.push_content(&mut content, &response.text(), options);
                    conversation.push(Message::assistant_blocks(response.content));
                }
                stop_reason => {
                    if stop_reason == StopReason::ToolUse {
                        warn!(round, "tool_use stop without tool_use blocks; finishing turn");
                    }

                    let content = self.assembler.assemble(&content, &response.content);
                    options.emit(TurnEvent::Content {
                        content: content.clone(),
                    });
                    options.emit(TurnEvent::Done {
                        turn_id: turn_id.to_string(),
                        input_tokens: usage.input_tokens,
                        output_tokens: usage.output_tokens,
                        rounds: round,
                    });

                    info!(
                        rounds = round,
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        chars = content.len(),
                        "Chat turn complete"
                    );
                    return Ok(TurnOutcome {
                        content,
                        input_tokens: usage.input_tokens,
                        output_tokens: usage.output_tokens,
                        rounds: round,
                    });
                }
            }
        }

        warn!(max_rounds = self.max_rounds, "Turn hit the round limit");
        Err(TurnError::MaxRoundsExceeded {
            max_rounds: self.max_rounds,
        })
    }

    async fn run_tool(&self, call: &ToolCall, content: &mut String, options: &TurnOptions) -> ToolResult {
        self.push_content(content, &format!("_Using tool: {}_", call.name), options);
        options.emit(TurnEvent::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
        });

        let result = match &options.executor {
            Some(executor) => executor.execute(call).await,
            None => ToolResult::error(NO_EXECUTOR_MESSAGE),
        };

        let output = result.joined_text();
        debug!(tool = %call.name, is_error = result.is_error, chars = output.len(), "Tool finished");
        options.emit(TurnEvent::ToolResult {
            id: call.id.clone(),
            name: call.name.clone(),
            output: output.clone(),
            is_error: result.is_error,
        });

        let label = if result.is_error { "Tool error" } else { "Tool result" };
        self.push_content(content, &format!("_{label}: {}_", preview(&output)), options);
        result
    }

    fn push_content(&self, content: &mut String, segment: &str, options: &TurnOptions) {
        if segment.is_empty() {
            return;
        }
        append_segment(content, segment);
        options.emit(TurnEvent::Content {
            content: content.clone(),
        });
    }
}

/// The `tool_use` blocks of a response, in model order.
fn tool_calls(blocks: &[ContentBlock]) -> Vec<ToolCall> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// A single-line excerpt of tool output for the transcript.
fn preview(output: &str) -> String {
    let flat = output.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= TOOL_PREVIEW_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(TOOL_PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}
