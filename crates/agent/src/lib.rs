//! The chat turn engine for Orcas.
//!
//! One turn follows a **Call → Act → Continue** cycle:
//!
//! 1. **Compact** the conversation history to the token budget
//! 2. **Call the model** through the configured provider, retrying transient failures
//! 3. **If tool calls**: execute tools in order, append results, loop back to step 2
//! 4. **If paused**: append the partial answer and loop back to step 2
//! 5. **Otherwise**: assemble the final answer (sources, truncation) and return it
//!
//! The loop runs until the model stops for any other reason, the round limit
//! is reached, or the caller cancels.
//!
//! [`planning`] builds on the same engine to break a task into subtasks.

pub mod assembler;
pub mod compaction;
pub mod engine;
pub mod error;
pub mod planning;
pub mod retry;
pub mod stream_event;

pub use assembler::{ResponseAssembler, Source, TRUNCATION_MARKER, UsageTotals};
pub use compaction::{CompactionPolicy, compact, estimate_tokens};
pub use engine::{ChatTurnConfig, ChatTurnEngine, TurnOptions, TurnOutcome, default_max_tokens};
pub use error::{PlanningError, TurnError};
pub use planning::{
    PlanningObserver, PlanningOutcome, PlanningProgress, PlanningStage, TaskPlanner,
};
pub use retry::{RetryError, RetryExecutor, RetryPolicy, Retryable};
pub use stream_event::{TurnEvent, TurnObserver};
