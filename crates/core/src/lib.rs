//! Core traits and types for the call-processing pipeline
//!
//! This crate provides foundational types used across all other crates:
//! - Call record and per-stage result types
//! - Stage outcome tagging (success / degraded)
//! - Audio buffer utilities (WAV I/O, loudness, resampling)
//! - Backend and store traits for dependency injection
//! - Error types

pub mod audio;
pub mod call;
pub mod error;
pub mod outcome;
pub mod traits;

pub use audio::AudioBuffer;
pub use call::{
    CallRecord, ClassificationResult, EnhancementStats, Intent, NewCallRecord, QualityScore,
    Sentiment, TranscriptionResult, TtsResult,
};
pub use error::{Error, Result};
pub use outcome::StageOutcome;

pub use traits::{
    CallRecordStore, DecodingOptions, RawTranscript, RecognitionRequest, SentimentBackend,
    SentimentLabel, SpeechBackend, SpeechModel, SpeechSynthesisBackend, SynthesisRequest,
};
