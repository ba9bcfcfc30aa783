//! Turn-level and planning failures.

use orcas_core::error::{ProviderError, StoreError};
use thiserror::Error;

/// Why a chat turn did not produce an answer.
///
/// Tool failures never appear here; they are fed back to the model.
#[derive(Debug, Error)]
pub enum TurnError {
    /// The model call failed permanently or exhausted its retries.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The caller cancelled the turn.
    #[error("Turn cancelled")]
    Cancelled,

    /// The model kept requesting more rounds than the turn allows.
    #[error("Turn exceeded the maximum of {max_rounds} model round trips")]
    MaxRoundsExceeded { max_rounds: u32 },
}

/// Why a task could not be planned.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("Task {0} not found")]
    TaskNotFound(i64),

    /// Fallback planning needs at least one user agent to assign work to.
    #[error("No agents available for fallback planning")]
    NoAgents,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Turn(#[from] TurnError),
}

impl PlanningError {
    /// Whether generic fallback planning may replace the failed attempt.
    ///
    /// Cancellation and a missing task are final.
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, Self::TaskNotFound(_) | Self::Turn(TurnError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_is_transparent() {
        let err = TurnError::from(ProviderError::Network("connection reset".into()));
        assert_eq!(err.to_string(), "Network error: connection reset");
    }

    #[test]
    fn cancellation_and_missing_task_skip_fallback() {
        assert!(!PlanningError::TaskNotFound(3).allows_fallback());
        assert!(!PlanningError::Turn(TurnError::Cancelled).allows_fallback());
        assert!(PlanningError::Turn(TurnError::MaxRoundsExceeded { max_rounds: 20 }).allows_fallback());
        assert!(PlanningError::Store(StoreError::Storage("disk full".into())).allows_fallback());
    }

    #[test]
    fn max_rounds_message() {
        let err = TurnError::MaxRoundsExceeded { max_rounds: 25 };
        assert!(err.to_string().contains("25"));
    }
}
