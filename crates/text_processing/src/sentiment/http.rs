//! HTTP sentiment backend
//!
//! Calls a hosted text-classification model using the Hugging Face inference
//! API contract: `POST {endpoint}/{model}` with `{"inputs": text}`, answered by
//! either `[{label, score}, ...]` or `[[{label, score}, ...]]`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use callbot_config::SentimentConfig;
use callbot_core::{SentimentBackend, SentimentLabel};

use crate::TextProcessingError;

/// HTTP sentiment backend configuration
#[derive(Debug, Clone)]
pub struct HttpSentimentConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl From<&SentimentConfig> for HttpSentimentConfig {
    fn from(config: &SentimentConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<SentimentLabel>>),
    Flat(Vec<SentimentLabel>),
}

impl InferenceResponse {
    fn into_labels(self) -> Vec<SentimentLabel> {
        match self {
            Self::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
            Self::Flat(labels) => labels,
        }
    }
}

/// Highest-scoring label
fn top_label(labels: Vec<SentimentLabel>) -> Option<SentimentLabel> {
    labels
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
}

/// Sentiment model behind an HTTP inference endpoint
pub struct HttpSentimentBackend {
    config: HttpSentimentConfig,
    client: reqwest::Client,
}

impl HttpSentimentBackend {
    pub fn new(config: HttpSentimentConfig) -> Result<Self, TextProcessingError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                TextProcessingError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!(
            model = %config.model,
            endpoint = %config.endpoint,
            "HTTP sentiment backend configured"
        );

        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn request(&self, text: &str) -> Result<SentimentLabel, TextProcessingError> {
        let mut request = self.client.post(self.url()).json(&InferenceRequest { inputs: text });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TextProcessingError::Backend(format!(
                "sentiment service returned {}: {}",
                status, body
            )));
        }

        let parsed: InferenceResponse = response
            .json()
            .await
            .map_err(|e| TextProcessingError::InvalidResponse(e.to_string()))?;

        top_label(parsed.into_labels())
            .ok_or_else(|| TextProcessingError::InvalidResponse("no labels returned".to_string()))
    }
}

#[async_trait]
impl SentimentBackend for HttpSentimentBackend {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn classify(&self, text: &str) -> callbot_core::Result<SentimentLabel> {
        Ok(self.request(text).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_response() {
        let parsed: InferenceResponse = serde_json::from_str(
            r#"[{"label": "negative", "score": 0.2}, {"label": "positive", "score": 0.7}]"#,
        )
        .unwrap();
        let top = top_label(parsed.into_labels()).unwrap();
        assert_eq!(top.label, "positive");
    }

    #[test]
    fn test_parse_nested_response() {
        let parsed: InferenceResponse = serde_json::from_str(
            r#"[[{"label": "Neutral", "score": 0.6}, {"label": "Negative", "score": 0.3}]]"#,
        )
        .unwrap();
        let top = top_label(parsed.into_labels()).unwrap();
        assert_eq!(top.label, "Neutral");
    }

    #[test]
    fn test_empty_response_has_no_label() {
        let parsed: InferenceResponse = serde_json::from_str("[]").unwrap();
        assert!(top_label(parsed.into_labels()).is_none());
    }

    #[test]
    fn test_url_joins_model() {
        let backend = HttpSentimentBackend::new(HttpSentimentConfig {
            endpoint: "http://localhost:8000/models/".to_string(),
            model: "cardiffnlp/twitter-xlm-roberta-base-sentiment".to_string(),
            api_key: None,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(
            backend.url(),
            "http://localhost:8000/models/cardiffnlp/twitter-xlm-roberta-base-sentiment"
        );
    }
}
