//! Speech recognizer
//!
//! Policy on top of a [`SpeechBackend`]:
//! 1. Optionally resample the input to mono 16 kHz into a scoped temp file.
//! 2. Transcribe with the default model; if it fails to load, use the
//!    fallback model.
//! 3. If confidence is below the threshold and the model used is not the top
//!    tier, retry once with the top tier and keep the more confident result.
//! 4. If step 2 failed, try the last-resort model on the original file with
//!    minimal decoding options; if that fails too, return the sentinel text.
//!
//! The recognizer never returns an error. Every temp file it creates is
//! removed before `transcribe` returns.

mod http_backend;

pub use http_backend::{HttpSpeechBackend, HttpSpeechConfig};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use callbot_config::constants::stt as defaults;
use callbot_config::SttConfig;
use callbot_core::{
    AudioBuffer, DecodingOptions, RawTranscript, RecognitionRequest, SpeechBackend, SpeechModel,
    StageOutcome, TranscriptionResult,
};
use tempfile::TempPath;

use crate::enhancer::temp_wav;
use crate::PipelineError;

/// Sample rate the recognition models expect
const PREPROCESS_RATE: u32 = 16_000;

/// Recognizer configuration
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    pub model: String,
    pub fallback_model: String,
    pub top_tier_model: String,
    pub last_resort_model: String,
    pub language: String,
    pub preprocess: bool,
    pub decoding: DecodingOptions,
    pub condition_on_previous_text: bool,
    pub initial_prompt: Option<String>,
    pub escalate_on_low_confidence: bool,
    pub low_confidence_threshold: f32,
    /// Directory for preprocessed audio (system temp dir when `None`)
    pub temp_dir: Option<PathBuf>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            fallback_model: defaults::FALLBACK_MODEL.to_string(),
            top_tier_model: defaults::TOP_TIER_MODEL.to_string(),
            last_resort_model: defaults::LAST_RESORT_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            preprocess: true,
            decoding: DecodingOptions::default(),
            condition_on_previous_text: true,
            initial_prompt: Some(defaults::DEFAULT_INITIAL_PROMPT.to_string()),
            escalate_on_low_confidence: true,
            low_confidence_threshold: defaults::LOW_CONFIDENCE_THRESHOLD,
            temp_dir: None,
        }
    }
}

impl From<&SttConfig> for RecognizerConfig {
    fn from(config: &SttConfig) -> Self {
        Self {
            model: config.model.clone(),
            fallback_model: config.fallback_model.clone(),
            top_tier_model: config.top_tier_model.clone(),
            last_resort_model: config.last_resort_model.clone(),
            language: config.language.clone(),
            preprocess: config.preprocess,
            decoding: DecodingOptions {
                beam_size: config.beam_size,
                best_of: config.best_of,
                temperature: config.temperature,
                compression_ratio_threshold: Some(config.compression_ratio_threshold),
                logprob_threshold: Some(config.logprob_threshold),
                no_speech_threshold: Some(config.no_speech_threshold),
            },
            condition_on_previous_text: config.condition_on_previous_text,
            initial_prompt: Some(config.initial_prompt.clone()).filter(|p| !p.trim().is_empty()),
            escalate_on_low_confidence: config.escalate_on_low_confidence,
            low_confidence_threshold: config.low_confidence_threshold,
            temp_dir: None,
        }
    }
}

pub struct SpeechRecognizer {
    backend: Arc<dyn SpeechBackend>,
    config: RecognizerConfig,
}

impl SpeechRecognizer {
    pub fn new(backend: Arc<dyn SpeechBackend>, config: RecognizerConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    /// Release models held by the backend
    pub async fn shutdown(&self) -> callbot_core::Result<()> {
        self.backend.shutdown().await
    }

    /// Transcribe `audio`; always yields some text
    pub async fn transcribe(&self, audio: &Path) -> StageOutcome<TranscriptionResult> {
        let prepared = if self.config.preprocess {
            match self.preprocess(audio).await {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(error = %e, "STT preprocessing failed, using input as-is");
                    None
                },
            }
        } else {
            None
        };
        let input: &Path = prepared.as_deref().unwrap_or(audio);

        let outcome = match self.primary(input).await {
            Ok((model, raw)) => StageOutcome::success(self.maybe_escalate(input, model, raw).await),
            Err(e) => {
                tracing::warn!(error = %e, "Primary transcription failed, trying last-resort model");
                self.last_resort(audio, e).await
            },
        };

        if let Some(path) = prepared {
            if let Err(e) = path.close() {
                tracing::warn!(error = %e, "Failed to remove preprocessed audio");
            }
        }

        outcome
    }

    /// Mono 16 kHz copy of `audio` in a scoped temp file
    async fn preprocess(&self, audio: &Path) -> Result<TempPath, PipelineError> {
        let audio = audio.to_path_buf();
        let temp_dir = self.config.temp_dir.clone();
        tokio::task::spawn_blocking(move || resample_to_temp(&audio, temp_dir.as_deref())).await?
    }

    fn request(&self, audio: &Path) -> RecognitionRequest {
        RecognitionRequest {
            audio_path: audio.to_path_buf(),
            language: self.config.language.clone(),
            decoding: self.config.decoding.clone(),
            condition_on_previous_text: self.config.condition_on_previous_text,
            initial_prompt: self.config.initial_prompt.clone(),
        }
    }

    /// Default model, or the fallback model if the default fails to load
    async fn load_primary(&self) -> callbot_core::Result<Arc<dyn SpeechModel>> {
        match self.backend.load_model(&self.config.model).await {
            Ok(model) => Ok(model),
            Err(e) => {
                tracing::warn!(
                    model = %self.config.model,
                    fallback = %self.config.fallback_model,
                    error = %e,
                    "Speech model failed to load, using fallback"
                );
                self.backend.load_model(&self.config.fallback_model).await
            },
        }
    }

    async fn primary(
        &self,
        input: &Path,
    ) -> callbot_core::Result<(Arc<dyn SpeechModel>, RawTranscript)> {
        let model = self.load_primary().await?;
        let raw = model.transcribe(&self.request(input)).await?;
        Ok((model, raw))
    }

    fn should_escalate(&self, model: &str, confidence: f32) -> bool {
        self.config.escalate_on_low_confidence
            && confidence < self.config.low_confidence_threshold
            && model != self.config.top_tier_model
    }

    async fn maybe_escalate(
        &self,
        input: &Path,
        model: Arc<dyn SpeechModel>,
        raw: RawTranscript,
    ) -> TranscriptionResult {
        let first = TranscriptionResult {
            text: raw.text.trim().to_string(),
            confidence: Some(raw.avg_logprob),
            model: Some(model.name().to_string()),
            escalated: false,
        };

        if !self.should_escalate(model.name(), raw.avg_logprob) {
            return first;
        }

        tracing::info!(
            model = model.name(),
            confidence = raw.avg_logprob,
            top_tier = %self.config.top_tier_model,
            "Low transcription confidence, retrying with top-tier model"
        );

        let top = match self.backend.load_model(&self.config.top_tier_model).await {
            Ok(top) => top,
            Err(e) => {
                tracing::warn!(error = %e, "Top-tier model failed to load, keeping first transcript");
                return first;
            },
        };

        match top.transcribe(&self.request(input)).await {
            Ok(better) if better.avg_logprob > raw.avg_logprob => TranscriptionResult {
                text: better.text.trim().to_string(),
                confidence: Some(better.avg_logprob),
                model: Some(top.name().to_string()),
                escalated: true,
            },
            Ok(worse) => {
                tracing::debug!(
                    first = raw.avg_logprob,
                    top_tier = worse.avg_logprob,
                    "Top-tier transcript was not more confident"
                );
                first
            },
            Err(e) => {
                tracing::warn!(error = %e, "Top-tier transcription failed, keeping first transcript");
                first
            },
        }
    }

    /// Smallest model on the original file, then the sentinel
    async fn last_resort(
        &self,
        original: &Path,
        cause: callbot_core::Error,
    ) -> StageOutcome<TranscriptionResult> {
        let name = &self.config.last_resort_model;
        let request = RecognitionRequest {
            audio_path: original.to_path_buf(),
            language: self.config.language.clone(),
            decoding: DecodingOptions::minimal(),
            condition_on_previous_text: self.config.condition_on_previous_text,
            initial_prompt: None,
        };

        let attempt = match self.backend.load_model(name).await {
            Ok(model) => model.transcribe(&request).await,
            Err(e) => Err(e),
        };

        match attempt {
            Ok(raw) => StageOutcome::degraded(
                TranscriptionResult {
                    text: raw.text.trim().to_string(),
                    confidence: Some(raw.avg_logprob),
                    model: Some(name.clone()),
                    escalated: false,
                },
                format!("primary transcription failed: {}", cause),
            ),
            Err(e) => {
                tracing::error!(
                    model = %name,
                    error = %e,
                    "Last-resort transcription failed, using sentinel transcript"
                );
                StageOutcome::degraded(
                    TranscriptionResult {
                        text: defaults::FAILURE_SENTINEL.to_string(),
                        confidence: None,
                        model: None,
                        escalated: false,
                    },
                    format!("all transcription attempts failed: {}; {}", cause, e),
                )
            },
        }
    }
}

fn resample_to_temp(audio: &Path, temp_dir: Option<&Path>) -> Result<TempPath, PipelineError> {
    let buffer = AudioBuffer::read_wav(audio)?.resample(PREPROCESS_RATE);
    let out = temp_wav(temp_dir, "callbot_stt_")?;
    buffer.write_wav(&out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use callbot_core::Error;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Scripted behavior per model tier
    #[derive(Clone)]
    enum Tier {
        Ok(&'static str, f32),
        LoadFails,
        TranscribeFails,
    }

    #[derive(Default)]
    struct Log {
        loads: Vec<String>,
        transcribed: Vec<(String, RecognitionRequest)>,
    }

    struct FakeModel {
        name: String,
        result: Option<(&'static str, f32)>,
        log: Arc<Mutex<Log>>,
    }

    #[async_trait]
    impl SpeechModel for FakeModel {
        fn name(&self) -> &str {
            &self.name
        }

        async fn transcribe(&self, request: &RecognitionRequest) -> callbot_core::Result<RawTranscript> {
            self.log
                .lock()
                .transcribed
                .push((self.name.clone(), request.clone()));
            match self.result {
                Some((text, avg_logprob)) => Ok(RawTranscript {
                    text: text.to_string(),
                    avg_logprob,
                }),
                None => Err(Error::Stt("decoder crashed".to_string())),
            }
        }
    }

    struct FakeBackend {
        tiers: HashMap<&'static str, Tier>,
        log: Arc<Mutex<Log>>,
    }

    impl FakeBackend {
        fn new(tiers: &[(&'static str, Tier)]) -> Arc<Self> {
            Arc::new(Self {
                tiers: tiers.iter().cloned().collect(),
                log: Arc::new(Mutex::new(Log::default())),
            })
        }

        fn loads(&self) -> Vec<String> {
            self.log.lock().loads.clone()
        }

        fn transcribed_models(&self) -> Vec<String> {
            self.log.lock().transcribed.iter().map(|(m, _)| m.clone()).collect()
        }
    }

    #[async_trait]
    impl SpeechBackend for FakeBackend {
        async fn load_model(&self, name: &str) -> callbot_core::Result<Arc<dyn SpeechModel>> {
            self.log.lock().loads.push(name.to_string());
            let result = match self.tiers.get(name) {
                Some(Tier::Ok(text, conf)) => Some((*text, *conf)),
                Some(Tier::TranscribeFails) => None,
                Some(Tier::LoadFails) | None => {
                    return Err(Error::ModelLoad {
                        model: name.to_string(),
                        message: "not available".to_string(),
                    })
                },
            };
            Ok(Arc::new(FakeModel {
                name: name.to_string(),
                result,
                log: self.log.clone(),
            }))
        }
    }

    fn recognizer(backend: &Arc<FakeBackend>) -> SpeechRecognizer {
        SpeechRecognizer::new(
            backend.clone(),
            RecognizerConfig {
                preprocess: false,
                ..RecognizerConfig::default()
            },
        )
    }

    fn audio() -> PathBuf {
        PathBuf::from("/recordings/call.wav")
    }

    #[tokio::test]
    async fn test_confident_transcript_is_kept() {
        let backend = FakeBackend::new(&[("medium", Tier::Ok(" سلام ", -0.3))]);
        let outcome = recognizer(&backend).transcribe(&audio()).await;

        assert!(!outcome.is_degraded());
        let result = outcome.into_value();
        assert_eq!(result.text, "سلام");
        assert_eq!(result.confidence, Some(-0.3));
        assert!(!result.escalated);
        assert_eq!(backend.loads(), vec!["medium"]);
    }

    #[tokio::test]
    async fn test_low_confidence_escalates_and_keeps_better() {
        let backend = FakeBackend::new(&[
            ("medium", Tier::Ok("سلم", -1.4)),
            ("large", Tier::Ok("سلام", -0.5)),
        ]);
        let result = recognizer(&backend).transcribe(&audio()).await.into_value();

        assert_eq!(result.text, "سلام");
        assert_eq!(result.model.as_deref(), Some("large"));
        assert!(result.escalated);
        assert_eq!(backend.transcribed_models(), vec!["medium", "large"]);
    }

    #[tokio::test]
    async fn test_escalation_keeps_original_when_top_tier_is_worse() {
        let backend = FakeBackend::new(&[
            ("medium", Tier::Ok("سلم", -1.2)),
            ("large", Tier::Ok("ثلام", -1.8)),
        ]);
        let result = recognizer(&backend).transcribe(&audio()).await.into_value();
        assert_eq!(result.text, "سلم");
        assert!(!result.escalated);
        assert_eq!(backend.loads(), vec!["medium", "large"]);
        assert_eq!(backend.transcribed_models(), vec!["medium", "large"]);
    }

    #[tokio::test]
    async fn test_escalates_once_even_if_top_tier_stays_below_threshold() {
        let backend = FakeBackend::new(&[
            ("medium", Tier::Ok("سلم", -1.6)),
            ("large", Tier::Ok("سلام", -1.3)),
            ("base", Tier::Ok("سلا", -0.2)),
        ]);
        let outcome = recognizer(&backend).transcribe(&audio()).await;
        assert!(!outcome.is_degraded());

        let result = outcome.into_value();
        assert_eq!(result.text, "سلام");
        assert_eq!(result.confidence, Some(-1.3));
        assert!(result.escalated);
        assert_eq!(backend.loads(), vec!["medium", "large"]);
        assert_eq!(backend.transcribed_models(), vec!["medium", "large"]);
    }

    #[tokio::test]
    async fn test_top_tier_failure_keeps_original() {
        let backend = FakeBackend::new(&[
            ("medium", Tier::Ok("سلم", -1.2)),
            ("large", Tier::TranscribeFails),
        ]);
        let outcome = recognizer(&backend).transcribe(&audio()).await;
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.into_value().text, "سلم");
    }

    #[tokio::test]
    async fn test_no_escalation_at_threshold_or_from_top_tier() {
        let backend = FakeBackend::new(&[("medium", Tier::Ok("سلام", -1.0))]);
        recognizer(&backend).transcribe(&audio()).await;
        assert_eq!(backend.loads(), vec!["medium"]);

        let backend = FakeBackend::new(&[("large", Tier::Ok("سلام", -2.5))]);
        let recognizer = SpeechRecognizer::new(
            backend.clone(),
            RecognizerConfig {
                model: "large".to_string(),
                preprocess: false,
                ..RecognizerConfig::default()
            },
        );
        recognizer.transcribe(&audio()).await;
        assert_eq!(backend.loads(), vec!["large"]);
    }

    #[tokio::test]
    async fn test_escalation_can_be_disabled() {
        let backend = FakeBackend::new(&[("medium", Tier::Ok("سلم", -3.0))]);
        let recognizer = SpeechRecognizer::new(
            backend.clone(),
            RecognizerConfig {
                escalate_on_low_confidence: false,
                preprocess: false,
                ..RecognizerConfig::default()
            },
        );
        recognizer.transcribe(&audio()).await;
        assert_eq!(backend.transcribed_models(), vec!["medium"]);
    }

    #[tokio::test]
    async fn test_load_failure_uses_fallback_model() {
        let backend = FakeBackend::new(&[
            ("medium", Tier::LoadFails),
            ("small", Tier::Ok("سلام", -0.2)),
        ]);
        let recognizer = SpeechRecognizer::new(
            backend.clone(),
            RecognizerConfig {
                fallback_model: "small".to_string(),
                preprocess: false,
                ..RecognizerConfig::default()
            },
        );
        let outcome = recognizer.transcribe(&audio()).await;
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.into_value().model.as_deref(), Some("small"));
        assert_eq!(backend.loads(), vec!["medium", "small"]);
    }

    #[tokio::test]
    async fn test_total_failure_uses_last_resort_on_original_file() {
        let backend = FakeBackend::new(&[
            ("medium", Tier::TranscribeFails),
            ("base", Tier::Ok("سلام", -0.9)),
        ]);
        let outcome = recognizer(&backend).transcribe(&audio()).await;

        assert!(outcome.is_degraded());
        let result = outcome.into_value();
        assert_eq!(result.text, "سلام");
        assert_eq!(result.model.as_deref(), Some("base"));

        let log = backend.log.lock();
        let (model, request) = log.transcribed.last().unwrap();
        assert_eq!(model, "base");
        assert_eq!(request.audio_path, audio());
        assert_eq!(request.decoding, DecodingOptions::minimal());
        assert!(request.initial_prompt.is_none());
    }

    #[tokio::test]
    async fn test_everything_fails_returns_sentinel() {
        let backend = FakeBackend::new(&[
            ("medium", Tier::LoadFails),
            ("base", Tier::TranscribeFails),
        ]);
        let outcome = recognizer(&backend).transcribe(&audio()).await;
        assert!(outcome.is_degraded());
        let result = outcome.into_value();
        assert_eq!(result.text, defaults::FAILURE_SENTINEL);
        assert_eq!(result.confidence, None);
    }

    #[tokio::test]
    async fn test_preprocessed_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("call.wav");
        AudioBuffer::new(vec![0.1; 8000], 8000).write_wav(&input).unwrap();

        let backend = FakeBackend::new(&[
            ("medium", Tier::Ok("سلم", -1.5)),
            ("large", Tier::Ok("سلام", -0.5)),
        ]);
        let scratch = tempfile::tempdir().unwrap();
        let recognizer = SpeechRecognizer::new(
            backend.clone(),
            RecognizerConfig {
                temp_dir: Some(scratch.path().to_path_buf()),
                ..RecognizerConfig::default()
            },
        );
        let result = recognizer.transcribe(&input).await.into_value();
        assert!(result.escalated);

        // the models saw the preprocessed copy, which is gone now
        let log = backend.log.lock();
        let seen = &log.transcribed[0].1.audio_path;
        assert_ne!(seen, &input);
        assert!(!seen.exists());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_preprocess_failure_uses_input() {
        let backend = FakeBackend::new(&[("medium", Tier::Ok("سلام", -0.2))]);
        let recognizer = SpeechRecognizer::new(backend.clone(), RecognizerConfig::default());
        // path does not exist, so preprocessing fails before any model call
        recognizer.transcribe(&audio()).await;
        let log = backend.log.lock();
        assert_eq!(log.transcribed[0].1.audio_path, audio());
    }
}
