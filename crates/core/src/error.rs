//! Error types shared by every crate in the workspace

use thiserror::Error;

/// Core error type
///
/// Crate-local errors (`LlmError`, `PipelineError`, `PersistenceError`, ...)
/// convert into this type at crate boundaries.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Speech recognition error: {0}")]
    Stt(String),

    #[error("Failed to load model {model}: {message}")]
    ModelLoad { model: String, message: String },

    #[error("Sentiment backend error: {0}")]
    Sentiment(String),

    #[error("Synthesis error: {0}")]
    Tts(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Duplicate call record: {0}")]
    DuplicateRecord(String),

    #[error("Input not found: {0}")]
    InputNotFound(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors that must abort a call instead of degrading it
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::MissingCredential(_) | Error::InputNotFound(_) | Error::Configuration(_)
        )
    }
}

impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => Error::Io(e),
            other => Error::Audio(other.to_string()),
        }
    }
}

/// Result alias using the core error
pub type Result<T> = std::result::Result<T, Error>;
