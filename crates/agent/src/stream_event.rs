//! Progress events emitted during a chat turn.
//!
//! The engine reports progress through a [`TurnObserver`] as it goes:
//! - `content`     - accumulated answer text so far (replaces the previous value)
//! - `tool_call`   - the model asked for a tool
//! - `tool_result` - a tool finished
//! - `retry`       - a model call failed and will be retried
//! - `done`        - the turn produced its final answer

use serde::{Deserialize, Serialize};

/// Events emitted by the engine while a turn runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Everything the user should see so far.
    Content { content: String },

    /// The model is calling a tool.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Tool execution completed.
    ToolResult {
        id: String,
        name: String,
        output: String,
        is_error: bool,
    },

    /// A model call failed transiently; another attempt follows after `delay_ms`.
    Retry {
        attempt: u32,
        delay_ms: u64,
        error: String,
    },

    /// The turn is complete.
    Done {
        turn_id: String,
        input_tokens: u64,
        output_tokens: u64,
        rounds: u32,
    },
}

impl TurnEvent {
    /// Wire name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Content { .. } => "content",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Retry { .. } => "retry",
            Self::Done { .. } => "done",
        }
    }
}

/// Receives [`TurnEvent`]s synchronously from the engine's task.
///
/// Implementations should return quickly; the turn waits on each call.
pub trait TurnObserver: Send + Sync {
    fn on_event(&self, event: &TurnEvent);
}

impl<F> TurnObserver for F
where
    F: Fn(&TurnEvent) + Send + Sync,
{
    fn on_event(&self, event: &TurnEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn content_serialization() {
        let event = TurnEvent::Content {
            content: "Hello".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"content""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn tool_result_serialization() {
        let event = TurnEvent::ToolResult {
            id: "toolu_1".into(),
            name: "read_task_notes".into(),
            output: "Error: task not found".into(),
            is_error: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"tool_result""#));
        assert!(json.contains(r#""is_error":true"#));
    }

    #[test]
    fn event_types() {
        let retry = TurnEvent::Retry {
            attempt: 1,
            delay_ms: 1000,
            error: "503".into(),
        };
        assert_eq!(retry.event_type(), "retry");

        let done = TurnEvent::Done {
            turn_id: "t".into(),
            input_tokens: 1,
            output_tokens: 2,
            rounds: 1,
        };
        assert_eq!(done.event_type(), "done");
    }

    #[test]
    fn closures_are_observers() {
        let seen = Mutex::new(Vec::new());
        let observer = |event: &TurnEvent| seen.lock().unwrap().push(event.event_type());
        observer.on_event(&TurnEvent::Content {
            content: String::new(),
        });
        assert_eq!(*seen.lock().unwrap(), vec!["content"]);
    }
}
