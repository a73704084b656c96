use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised while building or calling a text-generation backend.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing credential: {env_var} is not set")]
    MissingCredential { env_var: String },

    #[error("{backend} call failed: {message}")]
    Call { backend: String, message: String },
}

impl ProviderError {
    pub fn call(backend: impl std::fmt::Display, message: impl Into<String>) -> Self {
        ProviderError::Call {
            backend: backend.to_string(),
            message: message.into(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors a tool raises while running one block. The agent turns every one of
/// these into a failed `ExecutionResult`; they never leave the retry loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("Execution timed out after {0} seconds")]
    Timeout(u64),

    #[error("Command not allowed: {0}")]
    Disallowed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ToolResult<T> = Result<T, ToolError>;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Provider failed after every attempt: {0}")]
    Provider(#[from] ProviderError),

    #[error("Agent was stopped before finishing")]
    Cancelled,

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InteractionError {
    #[error("Another query is being processed, please wait")]
    Busy,

    #[error("No agents were registered")]
    NoAgents,

    #[error("No answer available")]
    NoAnswer,

    #[error("Fallback agent index {0} is out of range")]
    InvalidFallback(usize),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InteractionResult<T> = Result<T, InteractionError>;

/// Text carried by a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
