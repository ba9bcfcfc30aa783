//! Provider factory: builds the configured LLM provider.

use std::sync::Arc;

use orcas_config::{AppConfig, ProviderKind};
use orcas_core::error::ProviderError;
use orcas_core::provider::Provider;

use crate::anthropic::AnthropicProvider;
use crate::litellm::LiteLlmProvider;

/// Build the provider selected by `config.provider`.
///
/// Fails fast when a credential or the LiteLLM base URL is missing.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "{} API key not configured. Set api_key in config.toml or {}.",
                config.provider,
                config.provider.api_key_env()
            ))
        })?;

    let provider: Arc<dyn Provider> = match config.provider {
        ProviderKind::Anthropic => {
            let mut p = AnthropicProvider::new(api_key);
            if let Some(base_url) = &config.base_url {
                p = p.with_base_url(base_url.as_str());
            }
            Arc::new(p)
        }
        ProviderKind::LiteLlm => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                ProviderError::NotConfigured("LiteLLM base URL not configured".into())
            })?;
            Arc::new(LiteLlmProvider::new(base_url, api_key)?)
        }
    };

    tracing::debug!(provider = provider.name(), "Provider ready");
    Ok(provider)
}
