//! Speech processing traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::Result;

/// Decoder parameters passed to a recognition model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodingOptions {
    pub beam_size: u32,
    pub best_of: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio_threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprob_threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_speech_threshold: Option<f32>,
}

impl Default for DecodingOptions {
    fn default() -> Self {
        Self {
            beam_size: 5,
            best_of: 5,
            temperature: 0.0,
            compression_ratio_threshold: Some(2.4),
            logprob_threshold: Some(-1.0),
            no_speech_threshold: Some(0.6),
        }
    }
}

impl DecodingOptions {
    /// Decoder defaults with no thresholds, used by the last-resort attempt
    pub fn minimal() -> Self {
        Self {
            beam_size: 1,
            best_of: 1,
            temperature: 0.0,
            compression_ratio_threshold: None,
            logprob_threshold: None,
            no_speech_threshold: None,
        }
    }
}

/// One transcription request
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionRequest {
    pub audio_path: PathBuf,
    pub language: String,
    pub decoding: DecodingOptions,
    pub condition_on_previous_text: bool,
    pub initial_prompt: Option<String>,
}

/// Model output before the recognizer applies its policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTranscript {
    pub text: String,
    /// Average log-probability over decoded segments
    pub avg_logprob: f32,
}

/// A loaded recognition model
#[async_trait]
pub trait SpeechModel: Send + Sync {
    /// Model tier name ("base", "medium", "large", ...)
    fn name(&self) -> &str;

    async fn transcribe(&self, request: &RecognitionRequest) -> Result<RawTranscript>;
}

/// Loads recognition models by tier name
///
/// Implementations may cache loaded models; the recognizer loads the
/// top tier lazily and only on low confidence.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn load_model(&self, name: &str) -> Result<Arc<dyn SpeechModel>>;

    /// Release any held models
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Text-to-speech request
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub model: String,
    /// Language hint; "auto" lets the engine decide
    pub language: String,
}

/// Text-to-speech engine returning raw 16-bit PCM mono samples
#[async_trait]
pub trait SpeechSynthesisBackend: Send + Sync {
    /// Engine name recorded in synthesis metadata
    fn engine(&self) -> &str;

    /// Output sample rate of the returned PCM
    fn sample_rate(&self) -> u32;

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>>;
}
