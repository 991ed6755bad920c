//! HTTP STT Backend - calls an external Whisper sidecar
//!
//! Contract:
//! - `POST {url}/models/load` with `{"model": "<tier>"}` loads (or warms) a model
//! - `POST {url}/transcribe?model=..&language=..&beam_size=..` with the WAV
//!   file as body returns `{"text": "...", "avg_logprob": -0.4}`
//!
//! Loaded model handles are cached per tier name.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use callbot_config::SttConfig;
use callbot_core::{RawTranscript, RecognitionRequest, SpeechBackend, SpeechModel};

use crate::PipelineError;

/// HTTP STT backend configuration
#[derive(Debug, Clone)]
pub struct HttpSpeechConfig {
    /// Base URL of the sidecar
    pub url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpSpeechConfig {
    fn default() -> Self {
        Self {
            url: callbot_config::constants::stt::SIDECAR_DEFAULT.to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl From<&SttConfig> for HttpSpeechConfig {
    fn from(config: &SttConfig) -> Self {
        Self {
            url: config.endpoint.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    #[serde(default)]
    error: Option<String>,
}

/// Response from the sidecar `/transcribe` endpoint
#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
    avg_logprob: f32,
    #[serde(default)]
    error: Option<String>,
}

/// Query parameters for one transcription
fn query_params(model: &str, request: &RecognitionRequest) -> Vec<(&'static str, String)> {
    let decoding = &request.decoding;
    let mut params = vec![
        ("model", model.to_string()),
        ("language", request.language.clone()),
        ("beam_size", decoding.beam_size.to_string()),
        ("best_of", decoding.best_of.to_string()),
        ("temperature", decoding.temperature.to_string()),
        (
            "condition_on_previous_text",
            request.condition_on_previous_text.to_string(),
        ),
    ];
    if let Some(v) = decoding.compression_ratio_threshold {
        params.push(("compression_ratio_threshold", v.to_string()));
    }
    if let Some(v) = decoding.logprob_threshold {
        params.push(("logprob_threshold", v.to_string()));
    }
    if let Some(v) = decoding.no_speech_threshold {
        params.push(("no_speech_threshold", v.to_string()));
    }
    if let Some(prompt) = &request.initial_prompt {
        params.push(("initial_prompt", prompt.clone()));
    }
    params
}

/// A model tier held by the sidecar
struct HttpSpeechModel {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpSpeechModel {
    async fn request(&self, request: &RecognitionRequest) -> Result<RawTranscript, PipelineError> {
        let audio = tokio::fs::read(&request.audio_path).await?;

        let response = self
            .client
            .post(format!("{}/transcribe", self.url))
            .query(&query_params(&self.name, request))
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(audio)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::Stt(format!(
                "HTTP STT service returned error: {}",
                response.status()
            )));
        }

        let result: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Stt(format!("Failed to parse STT response: {}", e)))?;

        if let Some(error) = result.error {
            return Err(PipelineError::Stt(error));
        }

        Ok(RawTranscript {
            text: result.text,
            avg_logprob: result.avg_logprob,
        })
    }
}

#[async_trait]
impl SpeechModel for HttpSpeechModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transcribe(&self, request: &RecognitionRequest) -> callbot_core::Result<RawTranscript> {
        Ok(self.request(request).await?)
    }
}

/// Whisper sidecar backend
pub struct HttpSpeechBackend {
    config: HttpSpeechConfig,
    client: reqwest::Client,
    models: Mutex<HashMap<String, Arc<dyn SpeechModel>>>,
}

impl HttpSpeechBackend {
    pub fn new(config: HttpSpeechConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PipelineError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!(url = %config.url, "HTTP STT backend configured");

        Ok(Self {
            config,
            client,
            models: Mutex::new(HashMap::new()),
        })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    async fn load(&self, name: &str) -> Result<(), PipelineError> {
        let response = self
            .client
            .post(format!("{}/models/load", self.base_url()))
            .json(&LoadRequest { model: name })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::ModelLoad {
                model: name.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let parsed: LoadResponse = response.json().await.unwrap_or(LoadResponse { error: None });
        if let Some(error) = parsed.error {
            return Err(PipelineError::ModelLoad {
                model: name.to_string(),
                message: error,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SpeechBackend for HttpSpeechBackend {
    async fn load_model(&self, name: &str) -> callbot_core::Result<Arc<dyn SpeechModel>> {
        let cached = self.models.lock().get(name).cloned();
        if let Some(model) = cached {
            return Ok(model);
        }

        self.load(name).await.map_err(|e| match e {
            PipelineError::ModelLoad { model, message } => {
                callbot_core::Error::ModelLoad { model, message }
            },
            other => callbot_core::Error::ModelLoad {
                model: name.to_string(),
                message: other.to_string(),
            },
        })?;

        tracing::info!(model = name, "Speech model loaded");

        let model: Arc<dyn SpeechModel> = Arc::new(HttpSpeechModel {
            name: name.to_string(),
            url: self.base_url().to_string(),
            client: self.client.clone(),
        });
        self.models.lock().insert(name.to_string(), model.clone());
        Ok(model)
    }

    async fn shutdown(&self) -> callbot_core::Result<()> {
        self.models.lock().clear();
        Ok(())
    }
}
