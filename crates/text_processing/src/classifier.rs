//! Text classifier: sentiment + intent for one transcript

use callbot_core::{ClassificationResult, StageOutcome};

use crate::intent::IntentDetector;
use crate::sentiment::SentimentResolver;

/// Combines sentiment resolution and intent detection
pub struct TextClassifier {
    sentiment: SentimentResolver,
    intent: IntentDetector,
}

impl TextClassifier {
    pub fn new(sentiment: SentimentResolver, intent: IntentDetector) -> Self {
        Self { sentiment, intent }
    }

    pub fn sentiment(&self) -> &SentimentResolver {
        &self.sentiment
    }

    /// Never fails; a degraded outcome means the sentiment model was skipped
    pub async fn classify(&self, transcript: &str) -> StageOutcome<ClassificationResult> {
        let intent = self.intent.detect(transcript);
        let outcome = self.sentiment.resolve(transcript).await;

        tracing::debug!(
            sentiment = %outcome.value(),
            intent = %intent,
            strategy = self.sentiment.strategy().as_str(),
            "Transcript classified"
        );

        outcome.map(|sentiment| ClassificationResult { sentiment, intent })
    }
}

impl Default for TextClassifier {
    fn default() -> Self {
        Self::new(SentimentResolver::lexical_only(), IntentDetector::new())
    }
}
