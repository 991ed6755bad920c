//! Call orchestrator
//!
//! Drives one recorded call through every stage:
//!
//! ```text
//! Started → Enhanced? → Transcribed → Classified → Replied → Scored → Synthesized? → Persisted
//!                                                                           ↘ Aborted
//! ```
//!
//! Stage failures degrade to the best substitute input and are collected as
//! [`Degradation`] notes. Only a missing input file, a missing language model
//! credential or a failed insert abort the call; an aborted call persists
//! nothing. The enhanced audio file is removed before any terminal state.
//!
//! Dropping a `process_call` future mid-stage skips that cleanup, so callers
//! that may give up early use [`CallOrchestrator::spawn_call`].

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use callbot_config::Settings;
use callbot_core::{
    CallRecord, CallRecordStore, EnhancementStats, Error, NewCallRecord, QualityScore,
    SentimentBackend, SpeechBackend, StageOutcome, TtsResult,
};
use callbot_llm::ReplyGenerator;
use callbot_text_processing::{
    HttpSentimentBackend, HttpSentimentConfig, IntentDetector, QualityScorer, SentimentResolver,
    TextClassifier,
};

use crate::enhancer::{AudioEnhancer, EnhancementResult, EnhancerConfig};
use crate::stt::{HttpSpeechBackend, HttpSpeechConfig, RecognizerConfig, SpeechRecognizer};
use crate::tts::{SynthesisHints, VoiceSynthesizer};
use crate::PipelineError;

/// Pipeline position of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Started,
    Enhanced,
    Transcribed,
    Classified,
    Replied,
    Scored,
    Synthesized,
    Persisted,
    Aborted,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Enhanced => "enhanced",
            Self::Transcribed => "transcribed",
            Self::Classified => "classified",
            Self::Replied => "replied",
            Self::Scored => "scored",
            Self::Synthesized => "synthesized",
            Self::Persisted => "persisted",
            Self::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage that completed with a substitute result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Degradation {
    pub stage: &'static str,
    pub reason: String,
}

/// Successful run: the persisted record plus diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedCall {
    pub record: CallRecord,
    pub transcript_confidence: Option<f32>,
    pub stt_model: Option<String>,
    pub escalated: bool,
    pub enhancement: Option<EnhancementStats>,
    pub tts: Option<TtsResult>,
    pub degradations: Vec<Degradation>,
}

impl ProcessedCall {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Aborted run; nothing was persisted
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("call aborted after {last_state}: {error}")]
pub struct CallFailure {
    pub success: bool,
    pub error: String,
    pub processing_time_seconds: f64,
    /// Last state reached before the abort
    pub last_state: CallState,
}

impl CallFailure {
    fn new(error: &Error, started: Instant, last_state: CallState) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            processing_time_seconds: started.elapsed().as_secs_f64(),
            last_state,
        }
    }
}

/// Collects degradation notes and reports them as they happen
#[derive(Default)]
struct Degradations(Vec<Degradation>);

impl Degradations {
    fn push(&mut self, stage: &'static str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(stage, reason = %reason, "Stage degraded");
        metrics::counter!("callbot_stage_degraded_total", "stage" => stage).increment(1);
        self.0.push(Degradation { stage, reason });
    }

    fn take<T>(&mut self, stage: &'static str, outcome: StageOutcome<T>) -> T {
        let (value, reason) = outcome.into_parts();
        if let Some(reason) = reason {
            self.push(stage, reason);
        }
        value
    }
}

pub struct CallOrchestrator {
    enhancer: Option<AudioEnhancer>,
    recognizer: SpeechRecognizer,
    classifier: TextClassifier,
    generator: ReplyGenerator,
    scorer: QualityScorer,
    synthesizer: Option<VoiceSynthesizer>,
    store: Arc<dyn CallRecordStore>,
}

impl CallOrchestrator {
    pub fn new(
        recognizer: SpeechRecognizer,
        classifier: TextClassifier,
        generator: ReplyGenerator,
        store: Arc<dyn CallRecordStore>,
    ) -> Self {
        Self {
            enhancer: None,
            recognizer,
            classifier,
            generator,
            scorer: QualityScorer::new(),
            synthesizer: None,
            store,
        }
    }

    pub fn with_enhancer(mut self, enhancer: AudioEnhancer) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: VoiceSynthesizer) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_scorer(mut self, scorer: QualityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Wire every stage from settings with the HTTP backends
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn CallRecordStore>,
    ) -> Result<Self, PipelineError> {
        let speech: Arc<dyn SpeechBackend> =
            Arc::new(HttpSpeechBackend::new(HttpSpeechConfig::from(&settings.stt))?);
        let recognizer = SpeechRecognizer::new(speech, RecognizerConfig::from(&settings.stt));

        let sentiment_backend = if settings.sentiment.strategy.uses_model() {
            let backend = HttpSentimentBackend::new(HttpSentimentConfig::from(&settings.sentiment))
                .map_err(|e| PipelineError::Configuration(e.to_string()))?;
            Some(Arc::new(backend) as Arc<dyn SentimentBackend>)
        } else {
            None
        };
        let classifier = TextClassifier::new(
            SentimentResolver::from_config(&settings.sentiment, sentiment_backend),
            IntentDetector::new(),
        );

        let generator = ReplyGenerator::from_config(&settings.llm)
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        let mut orchestrator = Self::new(recognizer, classifier, generator, store);
        if settings.audio.enhance {
            orchestrator = orchestrator.with_enhancer(AudioEnhancer::with_default_reducer(
                EnhancerConfig::from(&settings.audio),
            ));
        }
        if settings.tts.enabled {
            orchestrator = orchestrator.with_synthesizer(VoiceSynthesizer::from_config(&settings.tts)?);
        }
        Ok(orchestrator)
    }

    pub fn synthesizer(&self) -> Option<&VoiceSynthesizer> {
        self.synthesizer.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn CallRecordStore> {
        &self.store
    }

    /// Process one recorded call end to end
    pub async fn process_call(&self, audio: &Path) -> Result<ProcessedCall, CallFailure> {
        let started = Instant::now();
        let result = self.run(audio, started).await;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::histogram!("callbot_call_duration_seconds").record(elapsed);
        let outcome = match &result {
            Ok(call) if call.is_degraded() => "degraded",
            Ok(_) => "success",
            Err(_) => "aborted",
        };
        metrics::counter!("callbot_calls_total", "outcome" => outcome).increment(1);

        result
    }

    /// Run [`process_call`](Self::process_call) as a detached task
    ///
    /// The call runs to a terminal state even if the handle is dropped.
    pub fn spawn_call(
        self: &Arc<Self>,
        audio: PathBuf,
    ) -> tokio::task::JoinHandle<Result<ProcessedCall, CallFailure>> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.process_call(&audio).await })
    }

    async fn run(&self, audio: &Path, started: Instant) -> Result<ProcessedCall, CallFailure> {
        let mut state = CallState::Started;
        let mut notes = Degradations::default();

        let input_exists = tokio::fs::metadata(audio)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !input_exists {
            return Err(self.abort(
                Error::InputNotFound(audio.display().to_string()),
                started,
                state,
            ));
        }

        tracing::info!(input = %audio.display(), "Processing call");

        let enhanced = self.enhance(audio, &mut notes).await;
        let enhancement = enhanced.as_ref().map(|e| e.stats.clone());
        if enhanced.is_some() {
            advance(&mut state, CallState::Enhanced);
        }

        let stt_input = enhanced.as_ref().map(|e| e.path()).unwrap_or(audio);
        let transcription = notes.take("stt", self.recognizer.transcribe(stt_input).await);
        release(enhanced);
        advance(&mut state, CallState::Transcribed);
        tracing::info!(
            model = transcription.model.as_deref().unwrap_or("none"),
            confidence = ?transcription.confidence,
            escalated = transcription.escalated,
            chars = transcription.text.chars().count(),
            "Call transcribed"
        );

        let transcript = transcription.text.as_str();
        let classification = notes.take("sentiment", self.classifier.classify(transcript).await);
        advance(&mut state, CallState::Classified);

        let reply = match self.generator.generate(&classification, transcript).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.abort(e.into(), started, state)),
        };
        let reply_degraded = reply.is_degraded();
        let reply_text = notes.take("reply", reply);
        advance(&mut state, CallState::Replied);

        // a diagnostic reply never counts as a good answer
        let quality = if reply_degraded {
            QualityScore::POOR
        } else {
            self.scorer.score(
                transcript,
                &reply_text,
                classification.intent,
                classification.sentiment,
            )
        };
        advance(&mut state, CallState::Scored);

        let tts = match &self.synthesizer {
            Some(synthesizer) => {
                let result = synthesizer
                    .synthesize(&reply_text, &SynthesisHints::default())
                    .await;
                match &result.error {
                    Some(error) => notes.push("tts", error.clone()),
                    None => advance(&mut state, CallState::Synthesized),
                }
                Some(result)
            },
            None => None,
        };
        let reply_audio_path = tts.as_ref().and_then(|t| t.audio_file.clone());

        let processing_time = started.elapsed().as_secs_f64();
        let new_record = NewCallRecord::new(
            classification,
            transcription.text.clone(),
            reply_text,
            processing_time,
            reply_audio_path.clone(),
            quality,
        );
        let unique_id = new_record.unique_id.clone();

        let record = match self.store.insert(new_record).await {
            Ok(record) => record,
            Err(e) => {
                if let Some(path) = &reply_audio_path {
                    if let Err(remove) = tokio::fs::remove_file(path).await {
                        tracing::warn!(path = %path.display(), error = %remove, "Failed to remove orphaned reply audio");
                    }
                }
                return Err(self.abort(e, started, state));
            },
        };
        advance(&mut state, CallState::Persisted);

        tracing::info!(
            unique_id = %unique_id,
            sentiment = %record.sentiment,
            intent = %record.intent,
            quality = record.quality_score.value(),
            processing_time_seconds = record.processing_time_seconds,
            degraded_stages = notes.0.len(),
            state = %state,
            "Call persisted"
        );

        Ok(ProcessedCall {
            record,
            transcript_confidence: transcription.confidence,
            stt_model: transcription.model,
            escalated: transcription.escalated,
            enhancement,
            tts,
            degradations: notes.0,
        })
    }

    /// Enhanced copy of `audio`, or `None` to continue with the original
    async fn enhance(&self, audio: &Path, notes: &mut Degradations) -> Option<EnhancementResult> {
        let enhancer = self.enhancer.as_ref()?;
        match enhancer.enhance_blocking(audio).await {
            Ok(result) => Some(result),
            Err(e) => {
                notes.push("enhance", e.to_string());
                None
            },
        }
    }

    fn abort(&self, error: Error, started: Instant, last_state: CallState) -> CallFailure {
        let failure = CallFailure::new(&error, started, last_state);
        tracing::debug!(from = %last_state, to = %CallState::Aborted, "Call state");
        tracing::error!(
            error = %failure.error,
            last_state = %last_state,
            processing_time_seconds = failure.processing_time_seconds,
            "Call aborted"
        );
        failure
    }
}

fn advance(state: &mut CallState, next: CallState) {
    tracing::debug!(from = %state, to = %next, "Call state");
    *state = next;
}

/// Delete the enhanced audio file, logging instead of failing
fn release(enhanced: Option<EnhancementResult>) {
    if let Some(enhanced) = enhanced {
        let path = enhanced.path().to_path_buf();
        if let Err(e) = enhanced.close() {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove enhanced audio");
        }
    }
}
