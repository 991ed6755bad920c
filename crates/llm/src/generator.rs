//! Reply generator
//!
//! Wraps an [`LlmBackend`] with the call pipeline's failure policy: a
//! timeout or any other service error is turned into a user-facing Persian
//! diagnostic that is returned as the reply (degraded), while a missing
//! credential is returned as an error and aborts the call.

use std::sync::Arc;

use callbot_config::LlmConfig;
use callbot_core::{ClassificationResult, StageOutcome};

use crate::backend::{LlmBackend, OpenAIBackend, OpenAIConfig, ReplyRequest};
use crate::prompt::compose_prompt;
use crate::LlmError;

/// Environment key holding the language model credential
pub const CREDENTIAL_ENV: &str = "METIS_API_KEY";

/// Reply used when the language model times out
pub const TIMEOUT_REPLY: &str = "خطا: پاسخ از سرویس GPT زمان‌بر شد. لطفاً دوباره تلاش کنید.";

/// Reply used for any other service failure
pub fn service_error_reply(error: &LlmError) -> String {
    format!("خطا در ارتباط با سرویس GPT: {}", error)
}

pub struct ReplyGenerator {
    /// `None` when no credential is configured
    backend: Option<Arc<dyn LlmBackend>>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ReplyGenerator {
    pub fn new(
        backend: Option<Arc<dyn LlmBackend>>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    /// Build with the OpenAI-compatible backend; a missing key is deferred
    /// to [`ReplyGenerator::generate`]
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let backend = match OpenAIConfig::from_settings(config) {
            Some(openai) => Some(Arc::new(OpenAIBackend::new(openai)?) as Arc<dyn LlmBackend>),
            None => None,
        };
        Ok(Self::new(
            backend,
            config.model.clone(),
            config.temperature,
            config.max_tokens,
        ))
    }

    pub fn has_credential(&self) -> bool {
        self.backend.is_some()
    }

    /// Generate a reply for the classified transcript
    pub async fn generate(
        &self,
        classification: &ClassificationResult,
        transcript: &str,
    ) -> Result<StageOutcome<String>, LlmError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| LlmError::MissingCredential(CREDENTIAL_ENV.to_string()))?;

        let request = ReplyRequest {
            model: self.model.clone(),
            prompt: compose_prompt(classification, transcript),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        match backend.complete(&request).await {
            Ok(text) => Ok(StageOutcome::success(text.trim().to_string())),
            Err(LlmError::MissingCredential(name)) => Err(LlmError::MissingCredential(name)),
            Err(LlmError::Timeout) => {
                tracing::warn!(model = %self.model, "Reply generation timed out");
                Ok(StageOutcome::degraded(
                    TIMEOUT_REPLY.to_string(),
                    LlmError::Timeout.to_string(),
                ))
            },
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "Reply generation failed");
                Ok(StageOutcome::degraded(service_error_reply(&e), e.to_string()))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use callbot_core::{Intent, Sentiment};
    use parking_lot::Mutex;

    enum Behavior {
        Reply(&'static str),
        Timeout,
        Api,
    }

    struct FakeBackend {
        behavior: Behavior,
        requests: Mutex<Vec<ReplyRequest>>,
    }

    #[async_trait]
    impl LlmBackend for FakeBackend {
        async fn complete(&self, request: &ReplyRequest) -> Result<String, LlmError> {
            self.requests.lock().push(request.clone());
            match self.behavior {
                Behavior::Reply(text) => Ok(text.to_string()),
                Behavior::Timeout => Err(LlmError::Timeout),
                Behavior::Api => Err(LlmError::Api("HTTP 500: boom".to_string())),
            }
        }

        fn model_name(&self) -> &str {
            "fake"
        }
    }

    fn generator(behavior: Behavior) -> (ReplyGenerator, Arc<FakeBackend>) {
        let backend = Arc::new(FakeBackend {
            behavior,
            requests: Mutex::new(Vec::new()),
        });
        let generator = ReplyGenerator::new(
            Some(backend.clone() as Arc<dyn LlmBackend>),
            "gpt-4.1-mini",
            0.2,
            256,
        );
        (generator, backend)
    }

    fn classification() -> ClassificationResult {
        ClassificationResult {
            sentiment: Sentiment::Neutral,
            intent: Intent::Pricing,
        }
    }

    #[tokio::test]
    async fn test_reply_is_trimmed() {
        let (generator, backend) = generator(Behavior::Reply("  قیمت ۲۰۰ هزار تومان است \n"));
        let outcome = generator
            .generate(&classification(), "قیمت چقدر است")
            .await
            .unwrap();
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.into_value(), "قیمت ۲۰۰ هزار تومان است");

        let requests = backend.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, 256);
        assert!(requests[0].prompt.contains("نیت: pricing"));
    }

    #[tokio::test]
    async fn test_timeout_becomes_diagnostic_reply() {
        let (generator, _) = generator(Behavior::Timeout);
        let outcome = generator.generate(&classification(), "سلام").await.unwrap();
        assert!(outcome.is_degraded());
        assert_eq!(outcome.into_value(), TIMEOUT_REPLY);
    }

    #[tokio::test]
    async fn test_other_error_embeds_error_text() {
        let (generator, _) = generator(Behavior::Api);
        let outcome = generator.generate(&classification(), "سلام").await.unwrap();
        let reply = outcome.into_value();
        assert!(reply.starts_with("خطا در ارتباط با سرویس GPT: "));
        assert!(reply.contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_missing_credential_is_error() {
        let generator = ReplyGenerator::new(None, "gpt-4.1-mini", 0.2, 256);
        assert!(!generator.has_credential());
        let err = generator
            .generate(&classification(), "سلام")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingCredential(ref name) if name == CREDENTIAL_ENV));
        assert!(callbot_core::Error::from(err).is_fatal());
    }
}
