//! Voice synthesizer
//!
//! Turns reply text into a 24 kHz mono 16-bit WAV under the responses
//! directory. Synthesis never fails the caller: every problem is reported in
//! [`TtsResult::error`] and no file is left behind.

mod gemini;

pub use gemini::{GeminiTtsBackend, GeminiTtsConfig};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use callbot_config::constants::tts as defaults;
use callbot_config::TtsConfig;
use callbot_core::{SpeechSynthesisBackend, SynthesisRequest, TtsResult};
use uuid::Uuid;

use crate::PipelineError;

const AUDIO_MIME: &str = "audio/wav";

/// Synthesizer configuration
#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    pub model: String,
    pub voice: String,
    pub lang: String,
    pub responses_dir: PathBuf,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            model: defaults::MODEL_DEFAULT.to_string(),
            voice: defaults::VOICE_DEFAULT.to_string(),
            lang: defaults::LANG_DEFAULT.to_string(),
            responses_dir: PathBuf::from(defaults::RESPONSES_DIR_DEFAULT),
        }
    }
}

impl From<&TtsConfig> for SynthesizerConfig {
    fn from(config: &TtsConfig) -> Self {
        Self {
            model: config.model.clone(),
            voice: config.voice.clone(),
            lang: config.lang.clone(),
            responses_dir: config.responses_dir.clone(),
        }
    }
}

/// Per-request overrides
#[derive(Debug, Clone, Default)]
pub struct SynthesisHints {
    pub voice: Option<String>,
    pub lang: Option<String>,
    /// Accepted for compatibility; prebuilt voices carry their own gender
    pub gender: Option<String>,
    /// Engine name, or "auto"
    pub server: Option<String>,
}

pub struct VoiceSynthesizer {
    /// `None` when no credential is configured
    backend: Option<Arc<dyn SpeechSynthesisBackend>>,
    config: SynthesizerConfig,
}

impl VoiceSynthesizer {
    pub fn new(backend: Option<Arc<dyn SpeechSynthesisBackend>>, config: SynthesizerConfig) -> Self {
        Self { backend, config }
    }

    /// Gemini-backed synthesizer; a missing key is reported per request
    pub fn from_config(config: &TtsConfig) -> Result<Self, PipelineError> {
        let backend = match GeminiTtsConfig::from_settings(config) {
            Some(gemini) => {
                Some(Arc::new(GeminiTtsBackend::new(gemini)?) as Arc<dyn SpeechSynthesisBackend>)
            },
            None => {
                tracing::warn!("GEMINI_API_KEY not set, speech synthesis will report errors");
                None
            },
        };
        Ok(Self::new(backend, SynthesizerConfig::from(config)))
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    fn engine(&self) -> &str {
        self.backend
            .as_ref()
            .map(|b| b.engine())
            .unwrap_or(defaults::ENGINE)
    }

    pub async fn synthesize(&self, text: &str, hints: &SynthesisHints) -> TtsResult {
        let voice = hints
            .voice
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.config.voice.clone());
        let lang = hints
            .lang
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.config.lang.clone());

        let mut result = TtsResult {
            engine: self.engine().to_string(),
            model: self.config.model.clone(),
            voice: voice.clone(),
            lang: lang.clone(),
            ..TtsResult::default()
        };

        if let Some(gender) = &hints.gender {
            tracing::debug!(gender = %gender, voice = %voice, "Gender hint ignored for prebuilt voice");
        }

        if let Some(server) = hints.server.as_deref() {
            if !server.eq_ignore_ascii_case("auto") && !server.eq_ignore_ascii_case(&result.engine) {
                result.error = Some(format!("unsupported TTS server: {}", server));
                return result;
            }
        }

        let text = text.trim();
        if text.is_empty() {
            result.error = Some("empty text".to_string());
            return result;
        }

        let Some(backend) = &self.backend else {
            result.error = Some("GEMINI_API_KEY not set".to_string());
            return result;
        };

        let request = SynthesisRequest {
            text: text.to_string(),
            voice,
            model: self.config.model.clone(),
            language: lang,
        };

        let pcm = match backend.synthesize(&request).await {
            Ok(pcm) => pcm,
            Err(e) => {
                tracing::warn!(engine = %result.engine, error = %e, "Speech synthesis failed");
                result.error = Some(e.to_string());
                return result;
            },
        };

        let path = self
            .config
            .responses_dir
            .join(format!("response_{}.wav", Uuid::new_v4()));
        match write_pcm16_wav(&path, &pcm, backend.sample_rate()).await {
            Ok(bytes) => {
                tracing::info!(
                    path = %path.display(),
                    bytes,
                    voice = %result.voice,
                    "Reply audio written"
                );
                result.status_code = 200;
                result.audio_file = Some(path);
                result.audio_mime = Some(AUDIO_MIME.to_string());
                result.bytes = bytes;
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to write reply audio");
                let _ = tokio::fs::remove_file(&path).await;
                result.error = Some(e.to_string());
            },
        }
        result
    }
}

/// Wrap little-endian PCM16 mono samples in a WAV file; returns the file size
async fn write_pcm16_wav(path: &Path, pcm: &[u8], sample_rate: u32) -> Result<usize, PipelineError> {
    if pcm.len() < 2 {
        return Err(PipelineError::Tts("no audio samples".to_string()));
    }
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let to_audio = |e: hound::Error| PipelineError::Audio(e.to_string());
    let mut writer = hound::WavWriter::create(path, spec).map_err(to_audio)?;
    for frame in pcm.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([frame[0], frame[1]]))
            .map_err(to_audio)?;
    }
    writer.finalize().map_err(to_audio)?;

    Ok(tokio::fs::metadata(path).await?.len() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use callbot_core::Error;

    struct FakeTts {
        pcm: Option<Vec<u8>>,
    }

    #[async_trait]
    impl SpeechSynthesisBackend for FakeTts {
        fn engine(&self) -> &str {
            "gemini"
        }

        fn sample_rate(&self) -> u32 {
            24_000
        }

        async fn synthesize(&self, _request: &SynthesisRequest) -> callbot_core::Result<Vec<u8>> {
            self.pcm
                .clone()
                .ok_or_else(|| Error::Tts("quota exceeded".to_string()))
        }
    }

    fn synthesizer(pcm: Option<Vec<u8>>, dir: &Path) -> VoiceSynthesizer {
        VoiceSynthesizer::new(
            Some(Arc::new(FakeTts { pcm })),
            SynthesizerConfig {
                responses_dir: dir.join("responses"),
                ..SynthesizerConfig::default()
            },
        )
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_writes_24k_wav() {
        let dir = tempfile::tempdir().unwrap();
        let pcm: Vec<u8> = (0..2400i16).flat_map(|s| s.to_le_bytes()).collect();
        let result = synthesizer(Some(pcm), dir.path())
            .synthesize("سلام، سفارش شما ارسال شد", &SynthesisHints::default())
            .await;

        assert!(result.is_success());
        assert_eq!(result.status_code, 200);
        assert_eq!(result.engine, "gemini");
        assert_eq!(result.voice, "achernar");
        assert_eq!(result.audio_mime.as_deref(), Some("audio/wav"));

        let path = result.audio_file.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("response_") && name.ends_with(".wav"));
        assert_eq!(result.bytes as u64, std::fs::metadata(&path).unwrap().len());

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 24_000);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 2400);
    }

    #[tokio::test]
    async fn test_voice_hint_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        let hints = SynthesisHints {
            voice: Some("kore".to_string()),
            lang: Some("fa-IR".to_string()),
            gender: Some("female".to_string()),
            server: Some("auto".to_string()),
        };
        let result = synthesizer(Some(vec![0; 480]), dir.path())
            .synthesize("سلام", &hints)
            .await;
        assert!(result.is_success());
        assert_eq!(result.voice, "kore");
        assert_eq!(result.lang, "fa-IR");
    }

    #[tokio::test]
    async fn test_missing_key_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let synthesizer = VoiceSynthesizer::new(
            None,
            SynthesizerConfig {
                responses_dir: dir.path().to_path_buf(),
                ..SynthesizerConfig::default()
            },
        );
        let result = synthesizer.synthesize("سلام", &SynthesisHints::default()).await;
        assert!(!result.is_success());
        assert_eq!(result.status_code, 0);
        assert!(result.error.unwrap().contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn test_empty_text_and_unknown_server() {
        let dir = tempfile::tempdir().unwrap();
        let synthesizer = synthesizer(Some(vec![0; 480]), dir.path());
        let result = synthesizer.synthesize("   ", &SynthesisHints::default()).await;
        assert_eq!(result.error.as_deref(), Some("empty text"));

        let hints = SynthesisHints {
            server: Some("coqui".to_string()),
            ..SynthesisHints::default()
        };
        let result = synthesizer.synthesize("سلام", &hints).await;
        assert!(result.error.unwrap().contains("coqui"));
        assert_eq!(file_count(&dir.path().join("responses")), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = synthesizer(None, dir.path())
            .synthesize("سلام", &SynthesisHints::default())
            .await;
        assert!(result.error.unwrap().contains("quota exceeded"));
        assert!(result.audio_file.is_none());
        assert_eq!(file_count(&dir.path().join("responses")), 0);
    }
}
