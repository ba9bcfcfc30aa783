//! Error types for the Orcas domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// The top-level error type for Orcas operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Storage errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Calendar errors ---
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures at the LLM invocation boundary.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {message} (status: {status_code})")]
    AuthenticationFailed { status_code: u16, message: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered, but the payload did not match the response schema.
    #[error("Malformed provider response: {reason}")]
    MalformedResponse { reason: String, raw: String },
}

impl ProviderError {
    /// The HTTP-like status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            Self::AuthenticationFailed { status_code, .. } => Some(*status_code),
            Self::RateLimited { .. } => Some(429),
            Self::ModelNotFound(_) => Some(404),
            _ => None,
        }
    }

    /// Build a `MalformedResponse` from a parse failure, keeping the raw body.
    pub fn malformed(reason: impl std::fmt::Display, raw: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.to_string(),
            raw: raw.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    /// A scoping identifier was absent from both the arguments and the context.
    #[error(
        "No {field} was provided and none is available from the current context. \
         Ask the user which {subject} to use, or pass {field} explicitly."
    )]
    MissingIdentifier {
        field: &'static str,
        subject: &'static str,
    },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum CalendarError {
    #[error("Calendar access not authorized")]
    PermissionDenied,

    #[error("Calendar unavailable: {0}")]
    Unavailable(String),

    #[error("Calendar query failed: {0}")]
    QueryFailed(String),
}
