//! Configuration loading, validation, and management for Orcas.
//!
//! Loads configuration from `~/.orcas/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.orcas/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which LLM gateway to talk to
    #[serde(default)]
    pub provider: ProviderKind,

    /// API key for the selected provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override (required for LiteLLM)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Default model (friendly name or full snapshot id)
    #[serde(default = "default_model")]
    pub default_model: String,

    /// System prompt sent with every chat turn
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// SQLite database path (defaults to `~/.orcas/orcas.db`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,

    /// Per-model overrides, keyed by model name
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    /// Retry policy for model calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// History compaction policy
    #[serde(default)]
    pub compaction: CompactionConfig,

    /// Turn loop limits
    #[serde(default)]
    pub turn: TurnConfig,
}

fn default_model() -> String {
    "claude-sonnet-4".into()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant embedded in a task manager. Use the available tools to read \
     and update task notes and space context, look up tasks and calendar events, and suggest \
     which agent should take on a piece of work."
        .into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("system_prompt", &self.system_prompt.len())
            .field("database_path", &self.database_path)
            .field("models", &self.models)
            .field("retry", &self.retry)
            .field("compaction", &self.compaction)
            .field("turn", &self.turn)
            .finish()
    }
}

/// Supported LLM gateways.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Messages API, `x-api-key` auth
    #[default]
    Anthropic,
    /// LiteLLM proxy speaking the Messages wire format, bearer auth
    #[serde(rename = "litellm")]
    LiteLlm,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::LiteLlm => "litellm",
        }
    }

    /// Provider-specific environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::LiteLlm => "LITELLM_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "litellm" => Ok(Self::LiteLlm),
            other => Err(ConfigError::ValidationError(format!("Unknown provider: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Max output tokens for this model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per model call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each subsequent one
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Estimated token budget for the history sent to the model
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Most recent messages that are never dropped
    #[serde(default = "default_recent_tail")]
    pub recent_tail: usize,
}

fn default_token_budget() -> usize {
    80_000
}
fn default_recent_tail() -> usize {
    5
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            recent_tail: default_recent_tail(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Model round trips allowed in one turn
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Final answer length cap, in characters
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
}

fn default_max_rounds() -> u32 {
    25
}
fn default_max_output_chars() -> usize {
    10_000
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            max_output_chars: default_max_output_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.orcas/config.toml).
    ///
    /// Environment overrides:
    /// - `ORCAS_API_KEY`, then `ANTHROPIC_API_KEY` / `LITELLM_API_KEY` (only when no key is configured)
    /// - `ORCAS_PROVIDER`, `ORCAS_MODEL`, `ORCAS_BASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("ORCAS_PROVIDER") {
            self.provider = provider.parse()?;
        }

        if let Some(model) = lookup("ORCAS_MODEL") {
            self.default_model = model;
        }

        if let Some(base_url) = lookup("ORCAS_BASE_URL") {
            self.base_url = Some(base_url);
        }

        if self.api_key.is_none() {
            self.api_key = lookup("ORCAS_API_KEY").or_else(|| lookup(self.provider.api_key_env()));
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".orcas")
    }

    /// Resolved SQLite database path.
    pub fn database_path(&self) -> PathBuf {
        match &self.database_path {
            Some(path) => expand_home(path),
            None => Self::config_dir().join("orcas.db"),
        }
    }

    /// Configured max output tokens for `model`, if any.
    pub fn max_tokens_for(&self, model: &str) -> Option<u32> {
        self.models.get(model).and_then(|m| m.max_tokens)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        if self.compaction.token_budget == 0 {
            return Err(ConfigError::ValidationError(
                "compaction.token_budget must be > 0".into(),
            ));
        }

        if self.compaction.recent_tail == 0 {
            return Err(ConfigError::ValidationError(
                "compaction.recent_tail must be at least 1".into(),
            ));
        }

        if self.turn.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "turn.max_rounds must be at least 1".into(),
            ));
        }

        if self.turn.max_output_chars == 0 {
            return Err(ConfigError::ValidationError(
                "turn.max_output_chars must be > 0".into(),
            ));
        }

        if self.provider == ProviderKind::LiteLlm {
            let base_url = self.base_url.as_deref().unwrap_or("").trim();
            if base_url.is_empty() {
                return Err(ConfigError::ValidationError(
                    "LiteLLM base URL cannot be empty".into(),
                ));
            }
            reqwest::Url::parse(base_url).map_err(|e| {
                ConfigError::ValidationError(format!("Invalid URL format: {e}"))
            })?;
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: None,
            base_url: None,
            default_model: default_model(),
            system_prompt: default_system_prompt(),
            database_path: None,
            models: HashMap::new(),
            retry: RetryConfig::default(),
            compaction: CompactionConfig::default(),
            turn: TurnConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs_home().join(rest),
        None => PathBuf::from(path),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, ProviderKind::Anthropic);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.compaction.token_budget, 80_000);
        assert_eq!(config.compaction.recent_tail, 5);
        assert_eq!(config.turn.max_rounds, 25);
        assert_eq!(config.turn.max_output_chars, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.turn.max_rounds, config.turn.max_rounds);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
provider = "litellm"
base_url = "https://llm.internal.example/"

[models.claude-opus-4]
max_tokens = 16000

[retry]
max_attempts = 5
"#,
        )
        .unwrap();
        assert_eq!(config.provider, ProviderKind::LiteLlm);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.max_tokens_for("claude-opus-4"), Some(16000));
        assert_eq!(config.max_tokens_for("claude-sonnet-4"), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn litellm_requires_base_url() {
        let config = AppConfig {
            provider: ProviderKind::LiteLlm,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            provider: ProviderKind::LiteLlm,
            base_url: Some("not a url".into()),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_limits_rejected() {
        let mut config = AppConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.turn.max_rounds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_model, "claude-sonnet-4");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_model = \"claude-haiku-4\"\n").unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model, "claude-haiku-4");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "provider = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("ORCAS_PROVIDER", "litellm"),
                ("ORCAS_MODEL", "claude-opus-4"),
                ("ORCAS_BASE_URL", "https://proxy.example"),
                ("LITELLM_API_KEY", "sk-lite"),
            ]))
            .unwrap();
        assert_eq!(config.provider, ProviderKind::LiteLlm);
        assert_eq!(config.default_model, "claude-opus-4");
        assert_eq!(config.base_url.as_deref(), Some("https://proxy.example"));
        assert_eq!(config.api_key.as_deref(), Some("sk-lite"));
    }

    #[test]
    fn configured_key_beats_environment() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config
            .apply_env(env(&[("ORCAS_API_KEY", "from-env")]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn unknown_provider_rejected() {
        let mut config = AppConfig::default();
        assert!(config.apply_env(env(&[("ORCAS_PROVIDER", "bedrock")])).is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-ant-very-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("anthropic"));
        assert!(toml_str.contains("max_rounds"));
    }
}
