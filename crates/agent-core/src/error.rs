//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error taxonomy
///
/// Only `Config`, `InvalidInput`, `Upstream` and `RequestTimeout` ever
/// surface to callers of `handle_message`. Tool-level failures are
/// absorbed by the reasoning loop and reflected in the [`Reply`]
/// instead.
///
/// [`Reply`]: crate::reasoning::Reply
#[derive(Error, Debug)]
pub enum AgentError {
    /// Invalid credentials or endpoint detected at construction.
    /// Fatal and permanent for the instance, no automatic retry.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Empty or whitespace-only request text, rejected before any
    /// model call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model endpoint unreachable or failing, surfaced after bounded
    /// retries are exhausted
    #[error("Upstream model error: {0}")]
    Upstream(String),

    /// Per-request deadline exceeded, the loop aborted cleanly
    #[error("Request timed out after {0:?}")]
    RequestTimeout(std::time::Duration),

    /// Second registration of an already-registered tool name
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// Model requested a tool that is not in the registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool handler failed during execution
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if a model call failing with this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::Upstream(_) | AgentError::Io(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Config(_) => {
                "The agent is not configured correctly. Please contact the operator.".into()
            }
            AgentError::InvalidInput(_) => "Please provide a non-empty message.".into(),
            AgentError::Upstream(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            AgentError::RequestTimeout(_) => {
                "The request took too long to process. Please try a simpler query.".into()
            }
            AgentError::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            AgentError::ToolExecution(msg) => format!("Tool error: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}
