//! Message and content-block domain types.
//!
//! These mirror the Messages wire format: a conversation is a list of
//! `Message`s, each either plain text or a list of typed `ContentBlock`s.
//! The block set is closed; a payload carrying an unrecognized block type
//! fails to deserialize instead of being silently dropped.

use serde::{Deserialize, Deserializer, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (also carries tool results back to the model)
    User,
    /// The AI assistant
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// Plain text or structured blocks
    pub content: MessageContent,
}

/// Message body: either a bare string or a list of content blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A typed content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Model- or user-authored text, optionally with source citations.
    Text {
        text: String,
        #[serde(
            default,
            deserialize_with = "null_as_default",
            skip_serializing_if = "Vec::is_empty"
        )]
        citations: Vec<Citation>,
    },

    /// A client-side tool invocation requested by the model.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// The answer to a `ToolUse`, keyed by its id.
    ToolResult {
        tool_use_id: String,
        content: Vec<ToolResultText>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },

    /// A tool the provider runs itself (e.g. web search). Carried verbatim.
    ServerToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Results of a provider-run web search. Carried verbatim.
    WebSearchToolResult {
        tool_use_id: String,
        content: serde_json::Value,
    },
}

/// A source reference attached to a text block.
///
/// Only `url` and `title` are interpreted; every other field the provider
/// sends is preserved so the block can be echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One `{"type": "text", "text": ...}` entry inside a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "text")]
pub struct ToolResultText {
    pub text: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Message {
    /// Create a plain-text user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a plain-text assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create an assistant message carrying raw response blocks.
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Create the user message that answers a round of tool calls.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(results),
        }
    }

    /// Character length of the message as it would be sent on the wire.
    ///
    /// Block content is measured on its JSON serialization.
    pub fn char_len(&self) -> usize {
        match &self.content {
            MessageContent::Text(text) => text.chars().count(),
            MessageContent::Blocks(blocks) => serde_json::to_string(blocks)
                .map(|json| json.chars().count())
                .unwrap_or_default(),
        }
    }

    /// Whether the message answers tool calls from the message before it.
    pub fn carries_tool_results(&self) -> bool {
        match &self.content {
            MessageContent::Text(_) => false,
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .any(|b| matches!(b, ContentBlock::ToolResult { .. })),
        }
    }

    /// Concatenated text of the message, ignoring non-text blocks.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks.iter().filter_map(ContentBlock::as_text).collect(),
        }
    }
}

impl ContentBlock {
    /// A text block without citations.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            citations: Vec::new(),
        }
    }

    /// A single-text tool result.
    pub fn tool_result(tool_use_id: impl Into<String>, text: impl Into<String>, is_error: bool) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: vec![ToolResultText { text: text.into() }],
            is_error,
        }
    }

    /// The text of a `Text` block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            Self::ToolUse { .. }
            | Self::ToolResult { .. }
            | Self::ServerToolUse { .. }
            | Self::WebSearchToolResult { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Hello, agent!");
    }

    #[test]
    fn plain_text_serializes_as_string() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn tool_result_wire_shape() {
        let msg = Message::tool_results(vec![ContentBlock::tool_result("toolu_1", "done", false)]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({
                "role": "user",
                "content": [{
                    "type": "tool_result",
                    "tool_use_id": "toolu_1",
                    "content": [{"type": "text", "text": "done"}]
                }]
            })
        );
    }

    #[test]
    fn error_flag_serialized_only_when_set() {
        let block = ContentBlock::tool_result("toolu_2", "boom", true);
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["is_error"], json!(true));
    }

    #[test]
    fn text_block_with_null_citations() {
        let block: ContentBlock =
            serde_json::from_value(json!({"type": "text", "text": "hi", "citations": null})).unwrap();
        assert_eq!(block, ContentBlock::text("hi"));
    }

    #[test]
    fn citation_preserves_unknown_fields() {
        let raw = json!({
            "type": "text",
            "text": "Rust 1.0 shipped in 2015.",
            "citations": [{
                "type": "web_search_result_location",
                "url": "https://blog.rust-lang.org/",
                "title": "Rust Blog",
                "cited_text": "Rust 1.0"
            }]
        });
        let block: ContentBlock = serde_json::from_value(raw.clone()).unwrap();
        match &block {
            ContentBlock::Text { citations, .. } => {
                assert_eq!(citations[0].url.as_deref(), Some("https://blog.rust-lang.org/"));
                assert_eq!(citations[0].extra["cited_text"], json!("Rust 1.0"));
            }
            other => panic!("expected text block, got {other:?}"),
        }
        assert_eq!(serde_json::to_value(&block).unwrap(), raw);
    }

    #[test]
    fn unknown_block_type_is_rejected() {
        let result: Result<ContentBlock, _> =
            serde_json::from_value(json!({"type": "hologram", "data": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn detects_tool_result_messages() {
        assert!(Message::tool_results(vec![ContentBlock::tool_result("toolu_1", "ok", false)]).carries_tool_results());
        assert!(!Message::user("ok").carries_tool_results());
        assert!(!Message::assistant_blocks(vec![ContentBlock::text("ok")]).carries_tool_results());
    }

    #[test]
    fn char_len_counts_characters_not_bytes() {
        assert_eq!(Message::user("héllo").char_len(), 5);
    }

    #[test]
    fn block_text_skips_tool_use() {
        let msg = Message::assistant_blocks(vec![
            ContentBlock::text("Let me check. "),
            ContentBlock::ToolUse {
                id: "toolu_1".into(),
                name: "list_agents".into(),
                input: json!({}),
            },
            ContentBlock::text("One moment."),
        ]);
        assert_eq!(msg.text(), "Let me check. One moment.");
    }
}
