//! Call record and per-stage result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Caller sentiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(Error::InvalidValue(format!("unknown sentiment: {}", other))),
        }
    }
}

/// Caller intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Pricing,
    ProductAvailability,
    DeliveryStatus,
    Refund,
    Complaint,
    /// Fallback when no category matches
    #[default]
    Faq,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pricing => "pricing",
            Self::ProductAvailability => "product_availability",
            Self::DeliveryStatus => "delivery_status",
            Self::Refund => "refund",
            Self::Complaint => "complaint",
            Self::Faq => "faq",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pricing" => Ok(Self::Pricing),
            "product_availability" => Ok(Self::ProductAvailability),
            "delivery_status" => Ok(Self::DeliveryStatus),
            "refund" => Ok(Self::Refund),
            "complaint" => Ok(Self::Complaint),
            "faq" => Ok(Self::Faq),
            other => Err(Error::InvalidValue(format!("unknown intent: {}", other))),
        }
    }
}

/// Binary reply quality signal (0 or 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct QualityScore(u8);

impl QualityScore {
    pub const POOR: Self = Self(0);
    pub const GOOD: Self = Self(1);

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_good(&self) -> bool {
        self.0 == 1
    }

    /// Any non-zero stored value reads back as good
    pub fn from_stored(value: i32) -> Self {
        if value == 0 {
            Self::POOR
        } else {
            Self::GOOD
        }
    }
}

/// Sentiment + intent for one transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClassificationResult {
    pub sentiment: Sentiment,
    pub intent: Intent,
}

/// Recognizer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Transcript text, or the failure sentinel
    pub text: String,
    /// Average log-probability; `None` when no model produced the text
    pub confidence: Option<f32>,
    /// Model that produced the kept transcript
    pub model: Option<String>,
    /// True when the top-tier retry replaced the first transcript
    pub escalated: bool,
}

/// Enhancement diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementStats {
    pub sample_rate: u32,
    pub duration_sec: f64,
    pub noise_reduction: bool,
    pub target_db: f32,
}

/// Synthesizer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TtsResult {
    pub engine: String,
    pub model: String,
    pub voice: String,
    pub lang: String,
    /// 200 when audio was written, 0 otherwise
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_mime: Option<String>,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TtsResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.audio_file.is_some()
    }
}

/// A fully assembled call, ready to persist
///
/// `unique_id` is generated once in [`NewCallRecord::new`]; the store assigns
/// `created_at` on insert and returns a [`CallRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCallRecord {
    pub unique_id: String,
    pub sentiment: Sentiment,
    pub intent: Intent,
    pub transcript: String,
    pub reply_text: String,
    pub processing_time_seconds: f64,
    pub reply_audio_path: Option<PathBuf>,
    pub quality_score: QualityScore,
}

impl NewCallRecord {
    pub fn new(
        classification: ClassificationResult,
        transcript: impl Into<String>,
        reply_text: impl Into<String>,
        processing_time_seconds: f64,
        reply_audio_path: Option<PathBuf>,
        quality_score: QualityScore,
    ) -> Self {
        Self {
            unique_id: Uuid::new_v4().to_string(),
            sentiment: classification.sentiment,
            intent: classification.intent,
            transcript: transcript.into(),
            reply_text: reply_text.into(),
            processing_time_seconds: processing_time_seconds.max(0.0),
            reply_audio_path,
            quality_score,
        }
    }

    /// Attach the persistence timestamp
    pub fn into_record(self, created_at: DateTime<Utc>) -> CallRecord {
        CallRecord {
            unique_id: self.unique_id,
            sentiment: self.sentiment,
            intent: self.intent,
            transcript: self.transcript,
            reply_text: self.reply_text,
            processing_time_seconds: self.processing_time_seconds,
            reply_audio_path: self.reply_audio_path,
            quality_score: self.quality_score,
            created_at,
        }
    }
}

/// Persisted call
///
/// Records are never updated; a correction is a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub unique_id: String,
    pub sentiment: Sentiment,
    pub intent: Intent,
    pub transcript: String,
    pub reply_text: String,
    pub processing_time_seconds: f64,
    pub reply_audio_path: Option<PathBuf>,
    pub quality_score: QualityScore,
    pub created_at: DateTime<Utc>,
}
