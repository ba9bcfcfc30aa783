//! LLM Provider implementations for Orcas.
//!
//! Both backends speak the Anthropic Messages wire format and implement the
//! `orcas_core::Provider` trait. The router builds the configured one.

pub mod anthropic;
pub mod litellm;
pub mod models;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use litellm::LiteLlmProvider;
pub use models::{derive_friendly_name, resolve_model_name};
pub use router::build_from_config;
