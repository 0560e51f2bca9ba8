//! Error types for the Standin domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Standin operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Conversation invariants ---
    #[error("Conversation error: {0}")]
    Conversation(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Malformed call to {tool_name}: {reason}")]
    MalformedCall { tool_name: String, reason: String },

    #[error("Tool execution failed: {tool_name} - {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool panicked: {tool_name} - {reason}")]
    Panicked { tool_name: String, reason: String },

    #[error("Tool registered twice: {0}")]
    DuplicateRegistration(String),

    #[error("No implementation registered for tool: {0}")]
    MissingImplementation(String),
}

/// Failures of the notification side channel.
///
/// These never escape a [`NotificationSink`](crate::notify::NotificationSink);
/// they are rendered into the `detail` of a failed outcome.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Network error: Notification timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}
