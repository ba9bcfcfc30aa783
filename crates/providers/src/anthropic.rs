//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly.
//!
//! Features:
//! - `x-api-key` header authentication (LiteLLM reuses this client with Bearer auth)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks
//! - Server-side web search blocks carried through verbatim

use async_trait::async_trait;
use orcas_core::error::ProviderError;
use orcas_core::message::{ContentBlock, Message};
use orcas_core::provider::*;
use orcas_core::tool::ToolSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// How the credential is presented to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    /// `x-api-key: <key>` plus `anthropic-version`
    ApiKey,
    /// `Authorization: Bearer <key>`
    Bearer,
}

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    auth: Auth,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            auth: Auth::ApiKey,
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub(crate) fn with_auth(mut self, name: impl Into<String>, auth: Auth) -> Self {
        self.name = name.into();
        self.auth = auth;
        self
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-request credential wins over the configured one.
    fn credential<'a>(&'a self, override_key: Option<&'a str>) -> Result<&'a str, ProviderError> {
        let key = override_key.unwrap_or(&self.api_key);
        if key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "{} API key not configured",
                self.name
            )));
        }
        Ok(key)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder, key: &str) -> reqwest::RequestBuilder {
        match self.auth {
            Auth::ApiKey => builder
                .header("x-api-key", key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            Auth::Bearer => builder.bearer_auth(key),
        }
    }

    /// POST `/v1/messages` and parse the structured response.
    pub(crate) async fn send_messages(
        &self,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let key = self.credential(request.api_key.as_deref())?;
        let url = format!("{}/v1/messages", self.base_url);

        let body = ApiRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages: &request.messages,
            system: request.system.as_deref(),
            tools: &request.tools,
        };

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .authorize(self.client.post(&url), key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(error_for_response(&self.name, response).await);
        }

        let raw = response.text().await.map_err(map_send_error)?;
        parse_response(&raw)
    }

    /// GET `/v1/models`, returning the raw body.
    pub(crate) async fn fetch_models_body(&self) -> Result<String, ProviderError> {
        let key = self.credential(None)?;
        let url = format!("{}/v1/models", self.base_url);

        let response = self
            .authorize(self.client.get(&url), key)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(error_for_response(&self.name, response).await);
        }

        response.text().await.map_err(map_send_error)
    }
}

#[async_trait]
impl orcas_core::Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.send_messages(request).await
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let raw = self.fetch_models_body().await?;
        models::parse_anthropic_models(&raw)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.fetch_models_body().await.map(|_| ())
    }
}

/// Parse a Messages API response body.
///
/// Anything that does not match the schema, including unknown content block
/// types, is a `MalformedResponse` carrying the raw payload.
pub(crate) fn parse_response(raw: &str) -> Result<ProviderResponse, ProviderError> {
    let api: ApiResponse = serde_json::from_str(raw).map_err(|e| {
        warn!(error = %e, "Provider response did not match the Messages schema");
        ProviderError::malformed(e, raw)
    })?;

    Ok(ProviderResponse {
        content: api.content,
        stop_reason: api.stop_reason.unwrap_or(StopReason::EndTurn),
        usage: api.usage.unwrap_or_default(),
        model: api.model.unwrap_or_default(),
    })
}

/// Map a non-success HTTP response to a `ProviderError`.
pub(crate) async fn error_for_response(provider: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    warn!(provider, status, body = %body, "Provider API error");
    error_for_status(status, retry_after, body)
}

pub(crate) fn error_for_status(status: u16, retry_after: Option<u64>, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        401 => ProviderError::AuthenticationFailed {
            status_code: status,
            message: "Authentication failed. Check your API key.".into(),
        },
        403 => ProviderError::AuthenticationFailed {
            status_code: status,
            message: "Access denied. Your API key may lack the required permissions.".into(),
        },
        404 if body.trim().is_empty() => ProviderError::ApiError {
            status_code: status,
            message: "Endpoint not found. Check the base URL for your provider.".into(),
        },
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

pub(crate) fn map_send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

// --- Messages API wire types ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolSchema],
}

fn no_tools(tools: &&[ToolSchema]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<StopReason>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}
