//! Error types for crucible-llm

use crucible_core::CollaboratorError;
use thiserror::Error;

/// Errors that can occur talking to the chat endpoint
#[derive(Error, Debug)]
pub enum LlmError {
    /// Endpoint could not be reached
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request exceeded the configured timeout
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not a chat response
    #[error("malformed chat response: {0}")]
    Malformed(String),

    /// Model returned no content
    #[error("model returned an empty message")]
    EmptyResponse,

    /// Client could not be constructed
    #[error("client configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Malformed(err.to_string())
    }
}

impl From<LlmError> for CollaboratorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(secs) => CollaboratorError::Timeout(secs),
            LlmError::Malformed(_) | LlmError::EmptyResponse => {
                CollaboratorError::UnusableOutput(err.to_string())
            }
            LlmError::Http(_) | LlmError::Status { .. } | LlmError::Config(_) => {
                CollaboratorError::Unreachable(err.to_string())
            }
        }
    }
}
