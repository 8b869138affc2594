//! Error types for the agent runtime

use thiserror::Error;

/// Errors that end an agent turn
#[derive(Debug, Error)]
pub enum AgentError {
    /// Model backend failure; the turn is rolled back and may be retried
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// BloodHound rejected the credential; no further request can succeed
    #[error("BloodHound authentication failed: {0}")]
    AuthFailure(String),

    /// The session was closed and accepts no more input
    #[error("Session is closed")]
    SessionClosed,

    /// Interrupted by the user; the turn is rolled back
    #[error("Operation was cancelled")]
    Cancelled,

    /// Empty or otherwise unusable user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AgentError {
    /// Whether the session survives this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, AgentError::AuthFailure(_) | AgentError::SessionClosed)
    }
}

/// Errors specific to the model backend
#[derive(Debug, Error)]
pub enum LlmError {
    /// Model not installed on the backend
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Backend answered with an error status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Backend unreachable
    #[error("Network error: {0}")]
    Network(String),

    /// Response could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// No response within the model's timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(0)
        } else if err.is_connect() {
            LlmError::Network(format!("Connection error: {}", err))
        } else if err.is_decode() {
            LlmError::Parse(err.to_string())
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
