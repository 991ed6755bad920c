//! Sentiment backend trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Label emitted by a sentiment model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentLabel {
    pub label: String,
    pub score: f32,
}

/// Pretrained multilingual sentiment model
#[async_trait]
pub trait SentimentBackend: Send + Sync {
    fn model_name(&self) -> &str;

    /// Return the top label for `text`
    async fn classify(&self, text: &str) -> Result<SentimentLabel>;
}
