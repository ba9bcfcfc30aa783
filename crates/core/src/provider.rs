//! Provider trait: the LLM invocation boundary.
//!
//! A Provider accepts a model id, message history, system prompt, token limit,
//! tool schemas, and an optional credential, and returns one structured
//! response. The turn engine treats it as an opaque async call.
//!
//! Implementations: Anthropic Messages API, LiteLLM gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{ContentBlock, Message};
use crate::tool::ToolSchema;

/// One request to the model.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "claude-sonnet-4-20250514")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Top-level system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,

    /// Credential override for this request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ProviderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRequest")
            .field("model", &self.model)
            .field("messages", &self.messages.len())
            .field("system", &self.system.as_ref().map(|s| s.len()))
            .field("max_tokens", &self.max_tokens)
            .field("tools", &self.tools.len())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    PauseTurn,
    MaxTokens,
    StopSequence,
    Refusal,
    #[serde(other)]
    Other,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Response content blocks, in model order
    pub content: Vec<ContentBlock>,

    /// Stop condition
    pub stop_reason: StopReason,

    /// Token usage for this round trip
    #[serde(default)]
    pub usage: Usage,

    /// Which model actually responded (may differ from requested)
    #[serde(default)]
    pub model: String,
}

impl ProviderResponse {
    /// Concatenated text of every `Text` block.
    pub fn text(&self) -> String {
        self.content.iter().filter_map(ContentBlock::as_text).collect()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A model advertised by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Full snapshot id, e.g. "claude-sonnet-4-20250514"
    pub id: String,
    /// Friendly name with the date suffix stripped, e.g. "claude-sonnet-4"
    pub display_name: String,
    /// Human label, e.g. "Claude Sonnet 4"
    pub display_label: String,
}

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The turn engine calls
/// `complete()` without knowing which provider is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic", "litellm").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// List available models for this provider.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        Ok(Vec::new())
    }

    /// Connection test: can we reach the provider with these credentials?
    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_stop_reasons() {
        let parse = |s: &str| serde_json::from_value::<StopReason>(json!(s)).unwrap();
        assert_eq!(parse("end_turn"), StopReason::EndTurn);
        assert_eq!(parse("tool_use"), StopReason::ToolUse);
        assert_eq!(parse("pause_turn"), StopReason::PauseTurn);
        assert_eq!(parse("model_context_window_exceeded"), StopReason::Other);
    }

    #[test]
    fn response_text_concatenates_blocks() {
        let resp: ProviderResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "text", "text": "world"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 3, "output_tokens": 2}
        }))
        .unwrap();
        assert_eq!(resp.text(), "Hello, world");
        assert_eq!(resp.usage.input_tokens, 3);
    }

    #[test]
    fn request_debug_redacts_key() {
        let req = ProviderRequest {
            model: "claude-sonnet-4".into(),
            messages: vec![Message::user("hi")],
            system: None,
            max_tokens: 1024,
            tools: vec![],
            api_key: Some("sk-ant-secret".into()),
        };
        let debug = format!("{req:?}");
        assert!(!debug.contains("sk-ant-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
