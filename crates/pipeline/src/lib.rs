//! Call-processing pipeline
//!
//! Stages, leaf-first:
//! - [`enhancer`]: resample, denoise and loudness-normalize into a scoped temp file
//! - [`stt`]: speech recognition with confidence-gated escalation
//! - [`tts`]: optional reply synthesis
//! - [`orchestrator`]: drives one call through every stage and persists the record
//!
//! Classification, reply generation and quality scoring live in
//! `callbot-text-processing` and `callbot-llm`; the orchestrator wires them in.

pub mod enhancer;
pub mod orchestrator;
pub mod stt;
pub mod tts;

pub use enhancer::{normalize_loudness, AudioEnhancer, EnhancementResult, EnhancerConfig, NoiseReducer};
pub use orchestrator::{CallFailure, CallOrchestrator, CallState, Degradation, ProcessedCall};
pub use stt::{HttpSpeechBackend, HttpSpeechConfig, RecognizerConfig, SpeechRecognizer};
pub use tts::{GeminiTtsBackend, GeminiTtsConfig, SynthesisHints, SynthesizerConfig, VoiceSynthesizer};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Noise reduction error: {0}")]
    NoiseReduction(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("Failed to load model {model}: {message}")]
    ModelLoad { model: String, message: String },

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Timeout")]
    Timeout,

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PipelineError::Timeout
        } else {
            PipelineError::Stt(err.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Task(err.to_string())
    }
}

impl From<callbot_core::Error> for PipelineError {
    fn from(err: callbot_core::Error) -> Self {
        match err {
            callbot_core::Error::Io(e) => PipelineError::Io(e),
            callbot_core::Error::ModelLoad { model, message } => {
                PipelineError::ModelLoad { model, message }
            },
            callbot_core::Error::Stt(msg) => PipelineError::Stt(msg),
            callbot_core::Error::Tts(msg) => PipelineError::Tts(msg),
            callbot_core::Error::Configuration(msg) => PipelineError::Configuration(msg),
            other => PipelineError::Audio(other.to_string()),
        }
    }
}

impl From<PipelineError> for callbot_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Audio(msg)
            | PipelineError::NoiseReduction(msg)
            | PipelineError::Task(msg) => {
                callbot_core::Error::Audio(msg)
            },
            PipelineError::Stt(msg) => callbot_core::Error::Stt(msg),
            PipelineError::ModelLoad { model, message } => {
                callbot_core::Error::ModelLoad { model, message }
            },
            PipelineError::Tts(msg) => callbot_core::Error::Tts(msg),
            PipelineError::Timeout => callbot_core::Error::Stt("request timed out".to_string()),
            PipelineError::Configuration(msg) => callbot_core::Error::Configuration(msg),
            PipelineError::Io(e) => callbot_core::Error::Io(e),
        }
    }
}
