//! Model catalog helpers: friendly names, labels, and name resolution.

use std::sync::LazyLock;

use orcas_core::error::ProviderError;
use orcas_core::provider::{ModelInfo, Provider};
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

static SNAPSHOT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d{8})$").expect("snapshot suffix pattern is valid"));

/// Strip a trailing `-YYYYMMDD` snapshot suffix.
///
/// `claude-sonnet-4-20250514` becomes `claude-sonnet-4`; ids without a
/// date suffix are returned unchanged.
pub fn derive_friendly_name(model_id: &str) -> String {
    SNAPSHOT_SUFFIX.replace(model_id, "").into_owned()
}

/// "claude-sonnet-4" becomes "Claude Sonnet 4".
pub fn title_case_label(friendly: &str) -> String {
    friendly
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(first) => first.to_uppercase().collect::<String>() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map a friendly name to its full snapshot id.
///
/// Falls back to `name` itself, which is then assumed to be a full id.
pub fn resolve_model_name(models: &[ModelInfo], name: &str) -> String {
    models
        .iter()
        .find(|m| m.display_name == name)
        .map(|m| m.id.clone())
        .unwrap_or_else(|| name.to_string())
}

/// Resolve `name` against the provider's live catalog.
///
/// A catalog that cannot be fetched leaves the name unresolved.
pub async fn resolve_with_provider(provider: &dyn Provider, name: &str) -> String {
    match provider.list_models().await {
        Ok(models) => resolve_model_name(&models, name),
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "Model listing failed, using name as given");
            name.to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicModelsResponse {
    data: Vec<AnthropicModel>,
}

#[derive(Debug, Deserialize)]
struct AnthropicModel {
    id: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiModelsResponse {
    data: Vec<OpenAiModel>,
}

#[derive(Debug, Deserialize)]
struct OpenAiModel {
    id: String,
}

/// `{"data": [{"id", "display_name"}]}`
pub(crate) fn parse_anthropic_models(raw: &str) -> Result<Vec<ModelInfo>, ProviderError> {
    let parsed: AnthropicModelsResponse =
        serde_json::from_str(raw).map_err(|e| ProviderError::malformed(e, raw))?;

    Ok(parsed
        .data
        .into_iter()
        .map(|m| ModelInfo {
            display_name: derive_friendly_name(&m.id),
            display_label: m.display_name,
            id: m.id,
        })
        .collect())
}

/// `{"data": [{"id"}]}`; labels are derived from the friendly name.
pub(crate) fn parse_openai_models(raw: &str) -> Result<Vec<ModelInfo>, ProviderError> {
    let parsed: OpenAiModelsResponse =
        serde_json::from_str(raw).map_err(|e| ProviderError::malformed(e, raw))?;

    Ok(parsed
        .data
        .into_iter()
        .map(|m| {
            let friendly = derive_friendly_name(&m.id);
            ModelInfo {
                display_label: title_case_label(&friendly),
                display_name: friendly,
                id: m.id,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendly_names() {
        assert_eq!(derive_friendly_name("claude-sonnet-4-20250514"), "claude-sonnet-4");
        assert_eq!(derive_friendly_name("claude-sonnet-4-5-20251012"), "claude-sonnet-4-5");
        assert_eq!(derive_friendly_name("claude-sonnet-4"), "claude-sonnet-4");
        assert_eq!(derive_friendly_name("model-2025051"), "model-2025051");
        assert_eq!(derive_friendly_name("20250514"), "20250514");
        assert_eq!(derive_friendly_name("model-123456789"), "model-123456789");
    }

    #[test]
    fn bare_snapshot_suffix_strips_to_empty() {
        assert_eq!(derive_friendly_name("-20250514"), "");
    }

    #[test]
    fn labels() {
        assert_eq!(title_case_label("claude-haiku-3-5"), "Claude Haiku 3 5");
        assert_eq!(title_case_label(""), "");
    }

    #[test]
    fn resolution_falls_back_to_input() {
        let models = vec![ModelInfo {
            id: "claude-sonnet-4-20250514".into(),
            display_name: "claude-sonnet-4".into(),
            display_label: "Claude Sonnet 4".into(),
        }];
        assert_eq!(resolve_model_name(&models, "claude-sonnet-4"), "claude-sonnet-4-20250514");
        assert_eq!(
            resolve_model_name(&models, "claude-opus-4-20250514"),
            "claude-opus-4-20250514"
        );
    }

    #[test]
    fn malformed_catalog() {
        assert!(matches!(
            parse_openai_models(r#"{"models": []}"#),
            Err(ProviderError::MalformedResponse { .. })
        ));
    }
}
