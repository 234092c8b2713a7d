use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single tool invocation. Stored in history as a tool result
/// so the model can react to it.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Transport or protocol failure from a completion backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error: {0}")]
    Server(reqwest::StatusCode),

    #[error("Request failed: {status}\n{body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider {0} does not support streaming")]
    StreamingUnsupported(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a turn ended without a final assistant message.
#[derive(Error, Debug)]
pub enum TurnError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Error during streaming: {source}")]
    Stream {
        partial: String,
        #[source]
        source: ProviderError,
    },

    #[error("Model requested tools for more than {0} consecutive rounds")]
    ToolRoundLimit(usize),

    /// Operator asked to stop. Not a failure.
    #[error("Turn cancelled by user")]
    Cancelled,
}

impl TurnError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TurnError::Cancelled)
    }
}
