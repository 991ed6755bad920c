//! Configuration management for the call bot
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default`, `config/{env}`)
//! - Environment variables (`CALLBOT__` prefix, `__` separator)
//! - Flat legacy environment keys (`WHISPER_MODEL`, `METIS_API_KEY`, ...) as field defaults

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, AudioConfig, LlmConfig, ObservabilityConfig, PersistenceConfig,
    RecordingsConfig, RuntimeEnvironment, SentimentConfig, SentimentStrategy, ServerConfig,
    Settings, SttConfig, TtsConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
