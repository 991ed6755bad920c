//! Sentiment resolution
//!
//! Three strategies, chosen by configuration:
//! - **lexical**: keyword tables only, negative checked before positive
//! - **model**: pretrained classifier, lexical result if the model fails
//! - **hybrid**: lexical first; the model is consulted only on a neutral result
//!
//! Resolution never fails. A model error is logged and reported as a
//! degraded outcome carrying the cheaper result.

mod http;

pub use http::{HttpSentimentBackend, HttpSentimentConfig};

use std::sync::Arc;

use callbot_config::{SentimentConfig, SentimentStrategy};
use callbot_core::{Sentiment, SentimentBackend, StageOutcome};

use crate::keywords::{CategoryTable, SENTIMENT_TABLE};

/// Map a model label onto the three sentiment classes
///
/// Substring match on the lowercased label: "pos" → positive, "neg" →
/// negative, anything else is neutral.
pub fn map_label(label: &str) -> Sentiment {
    let label = label.to_lowercase();
    if label.contains("pos") {
        Sentiment::Positive
    } else if label.contains("neg") {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// First `max_chars` characters of `text`
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Resolves caller sentiment with the configured strategy
pub struct SentimentResolver {
    strategy: SentimentStrategy,
    table: CategoryTable<Sentiment>,
    backend: Option<Arc<dyn SentimentBackend>>,
    max_input_chars: usize,
}

impl SentimentResolver {
    pub fn new(
        strategy: SentimentStrategy,
        backend: Option<Arc<dyn SentimentBackend>>,
        max_input_chars: usize,
    ) -> Self {
        Self {
            strategy,
            table: SENTIMENT_TABLE.clone(),
            backend,
            max_input_chars,
        }
    }

    pub fn from_config(config: &SentimentConfig, backend: Option<Arc<dyn SentimentBackend>>) -> Self {
        Self::new(config.strategy, backend, config.max_input_chars)
    }

    /// Keyword tables only
    pub fn lexical_only() -> Self {
        Self::new(
            SentimentStrategy::Lexical,
            None,
            callbot_config::constants::sentiment::MAX_INPUT_CHARS,
        )
    }

    pub fn strategy(&self) -> SentimentStrategy {
        self.strategy
    }

    /// Keyword lookup; negative wins when both lists match
    pub fn lexical(&self, text: &str) -> Sentiment {
        self.table.first_match(text).unwrap_or(Sentiment::Neutral)
    }

    /// Ask the sentiment model; `Err` carries the reason it was unusable
    pub async fn model(&self, text: &str) -> Result<Sentiment, String> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| "sentiment model not configured".to_string())?;

        let input = truncate_chars(text, self.max_input_chars);
        match backend.classify(input).await {
            Ok(label) => {
                let sentiment = map_label(&label.label);
                tracing::debug!(
                    model = backend.model_name(),
                    label = %label.label,
                    score = label.score,
                    sentiment = %sentiment,
                    "Sentiment model result"
                );
                Ok(sentiment)
            },
            Err(e) => Err(e.to_string()),
        }
    }

    pub async fn resolve(&self, text: &str) -> StageOutcome<Sentiment> {
        match self.strategy {
            SentimentStrategy::Lexical => StageOutcome::success(self.lexical(text)),
            SentimentStrategy::Model => match self.model(text).await {
                Ok(sentiment) => StageOutcome::success(sentiment),
                Err(reason) => {
                    let fallback = self.lexical(text);
                    tracing::warn!(
                        error = %reason,
                        fallback = %fallback,
                        "Sentiment model failed, using keyword result"
                    );
                    StageOutcome::degraded(fallback, reason)
                },
            },
            SentimentStrategy::Hybrid => {
                let lexical = self.lexical(text);
                if lexical != Sentiment::Neutral {
                    return StageOutcome::success(lexical);
                }
                match self.model(text).await {
                    Ok(sentiment) => StageOutcome::success(sentiment),
                    Err(reason) => {
                        tracing::warn!(
                            error = %reason,
                            "Sentiment model unavailable, keeping neutral"
                        );
                        StageOutcome::degraded(Sentiment::Neutral, reason)
                    },
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use callbot_core::{Error, SentimentLabel};
    use parking_lot::Mutex;

    struct FakeBackend {
        label: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(label: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                label,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl SentimentBackend for FakeBackend {
        fn model_name(&self) -> &str {
            "fake"
        }

        async fn classify(&self, text: &str) -> callbot_core::Result<SentimentLabel> {
            self.calls.lock().push(text.to_string());
            match self.label {
                Some(label) => Ok(SentimentLabel {
                    label: label.to_string(),
                    score: 0.9,
                }),
                None => Err(Error::Sentiment("model offline".to_string())),
            }
        }
    }

    fn resolver(strategy: SentimentStrategy, backend: &Arc<FakeBackend>) -> SentimentResolver {
        SentimentResolver::new(strategy, Some(backend.clone() as Arc<dyn SentimentBackend>), 512)
    }

    #[test]
    fn test_map_label() {
        assert_eq!(map_label("POSITIVE"), Sentiment::Positive);
        assert_eq!(map_label("Negative"), Sentiment::Negative);
        assert_eq!(map_label("neutral"), Sentiment::Neutral);
        assert_eq!(map_label("LABEL_1"), Sentiment::Neutral);
    }

    #[test]
    fn test_negative_wins_ties() {
        let resolver = SentimentResolver::lexical_only();
        assert_eq!(resolver.lexical("خوب بود ولی من ناراضی هستم"), Sentiment::Negative);
        assert_eq!(resolver.lexical("خیلی راضی هستم"), Sentiment::Positive);
        assert_eq!(resolver.lexical("قیمت این محصول چقدر است"), Sentiment::Neutral);
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        let text = "سلام".repeat(200);
        assert_eq!(truncate_chars(&text, 512).chars().count(), 512);
        assert_eq!(truncate_chars("کوتاه", 512), "کوتاه");
    }

    #[tokio::test]
    async fn test_hybrid_skips_model_when_lexical_decides() {
        let backend = FakeBackend::new(Some("positive"));
        let outcome = resolver(SentimentStrategy::Hybrid, &backend)
            .resolve("من عصبانی هستم")
            .await;
        assert_eq!(outcome.into_value(), Sentiment::Negative);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_hybrid_calls_model_exactly_once_on_neutral() {
        let backend = FakeBackend::new(Some("Positive"));
        let outcome = resolver(SentimentStrategy::Hybrid, &backend)
            .resolve("قیمت این محصول چقدر است")
            .await;
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.into_value(), Sentiment::Positive);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_hybrid_model_failure_keeps_neutral() {
        let backend = FakeBackend::new(None);
        let outcome = resolver(SentimentStrategy::Hybrid, &backend)
            .resolve("سلام")
            .await;
        assert!(outcome.is_degraded());
        assert_eq!(outcome.into_value(), Sentiment::Neutral);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_model_strategy_falls_back_to_lexical() {
        let backend = FakeBackend::new(None);
        let outcome = resolver(SentimentStrategy::Model, &backend)
            .resolve("خیلی خوشحال شدم")
            .await;
        assert!(outcome.is_degraded());
        assert_eq!(outcome.into_value(), Sentiment::Positive);
    }

    #[tokio::test]
    async fn test_model_input_is_truncated() {
        let backend = FakeBackend::new(Some("neutral"));
        let text = "الف".repeat(400);
        resolver(SentimentStrategy::Model, &backend).resolve(&text).await;
        let calls = backend.calls.lock();
        assert_eq!(calls[0].chars().count(), 512);
    }

    #[tokio::test]
    async fn test_missing_backend_degrades() {
        let resolver = SentimentResolver::new(SentimentStrategy::Hybrid, None, 512);
        let outcome = resolver.resolve("سلام").await;
        assert!(outcome.is_degraded());
        assert_eq!(outcome.into_value(), Sentiment::Neutral);
    }
}
