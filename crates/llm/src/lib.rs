//! Reply generation
//!
//! Features:
//! - OpenAI-compatible chat completions backend (bearer auth, bounded timeout)
//! - Prompt composition from classification + transcript
//! - Failure policy: service errors become a diagnostic reply, a missing
//!   credential is an error

pub mod backend;
pub mod generator;
pub mod prompt;

pub use backend::{LlmBackend, OpenAIBackend, OpenAIConfig, ReplyRequest};
pub use generator::{service_error_reply, ReplyGenerator, CREDENTIAL_ENV, TIMEOUT_REPLY};
pub use prompt::compose_prompt;

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for callbot_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingCredential(name) => callbot_core::Error::MissingCredential(name),
            LlmError::Configuration(msg) => callbot_core::Error::Configuration(msg),
            other => callbot_core::Error::Llm(other.to_string()),
        }
    }
}
