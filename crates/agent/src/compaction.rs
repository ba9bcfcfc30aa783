//! History compaction under a token budget.
//!
//! Token counts use a character heuristic: 1 token ≈ 4 characters, rounded up.
//! The most recent `recent_tail` messages are always kept. Older messages are
//! kept newest-first while they fit in what the tail leaves of the budget;
//! the walk stops at the first message that does not fit. When anything is
//! dropped, a user-role notice saying how many messages were omitted is put
//! at the front.
//!
//! A kept message carrying tool results always keeps the `tool_use` message
//! before it, even past the budget, so no result is left without its call.

use orcas_core::message::Message;
use tracing::debug;

/// Budget parameters for [`compact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionPolicy {
    /// Estimated-token budget for the whole history
    pub token_budget: usize,
    /// Messages at the end that are never dropped
    pub recent_tail: usize,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            token_budget: 80_000,
            recent_tail: 5,
        }
    }
}

impl From<&orcas_config::CompactionConfig> for CompactionPolicy {
    fn from(config: &orcas_config::CompactionConfig) -> Self {
        Self {
            token_budget: config.token_budget,
            recent_tail: config.recent_tail,
        }
    }
}

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Estimate the token count for one message.
///
/// Structured content is measured on its JSON serialization.
pub fn estimate_message_tokens(message: &Message) -> usize {
    message.char_len().div_ceil(4)
}

/// Estimate the token count for a slice of messages.
pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

/// The synthetic message that replaces `omitted` dropped messages.
pub fn omission_notice(omitted: usize) -> Message {
    Message::user(format!(
        "[Context note: {omitted} earlier message(s) omitted to stay within the context budget.]"
    ))
}

/// Reduce `messages` to fit `policy`, preserving order.
///
/// The cut never separates a `tool_result` message from the assistant
/// `tool_use` message it answers.
pub fn compact(messages: &[Message], policy: &CompactionPolicy) -> Vec<Message> {
    if messages.len() <= policy.recent_tail {
        return messages.to_vec();
    }

    let split = messages.len() - policy.recent_tail;
    let (older, tail) = messages.split_at(split);
    let tail_tokens = estimate_messages_tokens(tail);

    let mut kept_older = 0;
    if tail_tokens < policy.token_budget {
        let mut remaining = policy.token_budget - tail_tokens;
        for message in older.iter().rev() {
            let cost = estimate_message_tokens(message);
            if cost > remaining {
                break;
            }
            remaining -= cost;
            kept_older += 1;
        }
    }

    let mut start = split - kept_older;
    while start > 0 && messages.get(start).is_some_and(Message::carries_tool_results) {
        start -= 1;
    }
    let kept_older = split - start;

    let omitted = older.len() - kept_older;
    if omitted == 0 {
        return messages.to_vec();
    }

    debug!(
        total = messages.len(),
        omitted,
        tail_tokens,
        budget = policy.token_budget,
        "Compacted conversation history"
    );

    let mut out = Vec::with_capacity(1 + kept_older + tail.len());
    out.push(omission_notice(omitted));
    out.extend_from_slice(&older[split - kept_older..]);
    out.extend_from_slice(tail);
    out
}
