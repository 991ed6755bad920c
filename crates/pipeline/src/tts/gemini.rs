//! Gemini text-to-speech backend
//!
//! `POST {endpoint}/models/{model}:generateContent` with an audio response
//! modality and a prebuilt voice. The reply carries base64 PCM16 mono at
//! 24 kHz in `candidates[0].content.parts[0].inlineData.data`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use callbot_config::constants::{audio, tts};
use callbot_config::TtsConfig;
use callbot_core::{Error, SpeechSynthesisBackend, SynthesisRequest};

use crate::PipelineError;

#[derive(Debug, Clone)]
pub struct GeminiTtsConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl GeminiTtsConfig {
    /// `None` when no API key is configured
    pub fn from_settings(config: &TtsConfig) -> Option<Self> {
        config
            .api_key
            .as_ref()
            .filter(|key| !key.trim().is_empty())
            .map(|key| Self {
                endpoint: config.endpoint.clone(),
                api_key: key.clone(),
                timeout: Duration::from_secs(config.timeout_seconds),
            })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: SpeechConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_code: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoice<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

impl<'a> GenerateRequest<'a> {
    fn new(request: &'a SynthesisRequest) -> Self {
        let language_code = match request.language.trim() {
            "" => None,
            lang if lang.eq_ignore_ascii_case("auto") => None,
            lang => Some(lang),
        };
        Self {
            contents: vec![Content {
                parts: vec![TextPart {
                    text: &request.text,
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoice {
                            voice_name: &request.voice,
                        },
                    },
                    language_code,
                },
            },
        }
    }
}

impl GenerateResponse {
    /// Decoded PCM of the first inline audio part
    fn into_pcm(self) -> Result<Vec<u8>, PipelineError> {
        let data = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.inline_data)
            .ok_or_else(|| PipelineError::Tts("no audio in response".to_string()))?;
        BASE64
            .decode(data.data.as_bytes())
            .map_err(|e| PipelineError::Tts(format!("invalid base64 audio: {}", e)))
    }
}

pub struct GeminiTtsBackend {
    config: GeminiTtsConfig,
    client: Client,
}

impl GeminiTtsBackend {
    pub fn new(config: GeminiTtsConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            model
        )
    }

    async fn request(&self, request: &SynthesisRequest) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .client
            .post(self.url(&request.model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&GenerateRequest::new(request))
            .send()
            .await
            .map_err(tts_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Tts(format!("HTTP {}: {}", status, body)));
        }

        let parsed: GenerateResponse = response.json().await.map_err(tts_error)?;
        parsed.into_pcm()
    }
}

fn tts_error(err: reqwest::Error) -> PipelineError {
    if err.is_timeout() {
        PipelineError::Timeout
    } else {
        PipelineError::Tts(err.to_string())
    }
}

#[async_trait]
impl SpeechSynthesisBackend for GeminiTtsBackend {
    fn engine(&self) -> &str {
        tts::ENGINE
    }

    fn sample_rate(&self) -> u32 {
        audio::TTS_SAMPLE_RATE
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> callbot_core::Result<Vec<u8>> {
        self.request(request).await.map_err(|e| match e {
            PipelineError::Timeout => Error::Tts("request timed out".to_string()),
            other => other.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(lang: &str) -> SynthesisRequest {
        SynthesisRequest {
            text: "سلام".to_string(),
            voice: "achernar".to_string(),
            model: "gemini-2.5-flash-preview-tts".to_string(),
            language: lang.to_string(),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let req = request("fa-IR");
        let json = serde_json::to_value(GenerateRequest::new(&req)).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "سلام");
        assert_eq!(json["generationConfig"]["responseModalities"][0], "AUDIO");
        let speech = &json["generationConfig"]["speechConfig"];
        assert_eq!(speech["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"], "achernar");
        assert_eq!(speech["languageCode"], "fa-IR");
    }

    #[test]
    fn test_auto_language_is_omitted() {
        let req = request("auto");
        let json = serde_json::to_value(GenerateRequest::new(&req)).unwrap();
        assert!(json["generationConfig"]["speechConfig"]
            .get("languageCode")
            .is_none());
    }

    #[test]
    fn test_response_decoding() {
        let pcm = vec![1u8, 0, 255, 127];
        let body = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"inlineData": {"mimeType": "audio/L16", "data": BASE64.encode(&pcm)}}]}
            }]
        });
        let parsed: GenerateResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.into_pcm().unwrap(), pcm);
    }

    #[test]
    fn test_empty_response_is_error() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(parsed.into_pcm().is_err());
    }

    #[test]
    fn test_url_and_missing_key() {
        let mut settings = TtsConfig::default();
        settings.api_key = Some("  ".to_string());
        assert!(GeminiTtsConfig::from_settings(&settings).is_none());

        settings.api_key = Some("key".to_string());
        settings.endpoint = "https://example.test/v1beta/".to_string();
        let backend = GeminiTtsBackend::new(GeminiTtsConfig::from_settings(&settings).unwrap()).unwrap();
        assert_eq!(
            backend.url("tts-model"),
            "https://example.test/v1beta/models/tts-model:generateContent"
        );
    }
}
