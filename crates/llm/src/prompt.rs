//! Prompt composition

use callbot_core::ClassificationResult;

/// User message sent to the language model
///
/// Embeds the classification labels ahead of the transcript so the model can
/// match tone and topic.
pub fn compose_prompt(classification: &ClassificationResult, transcript: &str) -> String {
    format!(
        "احساسات: {}, نیت: {}, متن: {}",
        classification.sentiment, classification.intent, transcript
    )
}
