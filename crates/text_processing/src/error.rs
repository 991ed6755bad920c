//! Text processing errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextProcessingError {
    #[error("Sentiment backend error: {0}")]
    Backend(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for TextProcessingError {
    fn from(err: reqwest::Error) -> Self {
        TextProcessingError::Network(err.to_string())
    }
}

impl From<TextProcessingError> for callbot_core::Error {
    fn from(err: TextProcessingError) -> Self {
        match err {
            TextProcessingError::Configuration(msg) => callbot_core::Error::Configuration(msg),
            other => callbot_core::Error::Sentiment(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TextProcessingError>;
