//! LiteLLM gateway provider.
//!
//! LiteLLM proxies the Anthropic Messages format at `{base_url}/v1/messages`,
//! authenticates with a Bearer token, and lists models in the OpenAI shape.

use async_trait::async_trait;
use orcas_core::error::ProviderError;
use orcas_core::provider::{ModelInfo, ProviderRequest, ProviderResponse};

use crate::anthropic::{AnthropicProvider, Auth};
use crate::models;

/// LiteLLM gateway speaking the Messages wire format.
pub struct LiteLlmProvider {
    inner: AnthropicProvider,
}

impl LiteLlmProvider {
    /// Create a provider for the gateway at `base_url`.
    ///
    /// The base URL must parse as an absolute URL; a trailing slash is ignored.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(ProviderError::NotConfigured(
                "LiteLLM base URL cannot be empty".into(),
            ));
        }
        reqwest::Url::parse(trimmed)
            .map_err(|e| ProviderError::NotConfigured(format!("Invalid URL format: {e}")))?;

        let inner = AnthropicProvider::new(api_key)
            .with_base_url(trimmed)
            .with_auth("litellm", Auth::Bearer);
        Ok(Self { inner })
    }

    pub fn base_url(&self) -> &str {
        self.inner.base_url()
    }
}

#[async_trait]
impl orcas_core::Provider for LiteLlmProvider {
    fn name(&self) -> &str {
        "litellm"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.inner.send_messages(request).await
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let raw = self.inner.fetch_models_body().await?;
        models::parse_openai_models(&raw)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.inner.fetch_models_body().await.map(|_| ())
    }
}
