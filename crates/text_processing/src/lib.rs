//! Text processing for the call bot
//!
//! This crate turns a Persian transcript into labels and scores:
//! - **Keyword tables**: data-driven category → keyword sets with a word-boundary matcher
//! - **Sentiment**: lexical, strong-model and hybrid strategies
//! - **Intent**: single-pass first-match over ordered categories
//! - **Reply quality**: binary heuristic score for generated replies
//!
//! # Example
//!
//! ```
//! use callbot_text_processing::IntentDetector;
//! use callbot_core::Intent;
//!
//! let detector = IntentDetector::new();
//! assert_eq!(detector.detect("قیمت این محصول چقدر است"), Intent::Pricing);
//! ```

pub mod classifier;
pub mod intent;
pub mod keywords;
pub mod quality;
pub mod sentiment;

mod error;

pub use classifier::TextClassifier;
pub use error::{Result, TextProcessingError};
pub use intent::IntentDetector;
pub use keywords::{CategoryTable, KeywordSet, MatchMode};
pub use quality::QualityScorer;
pub use sentiment::{map_label, HttpSentimentBackend, HttpSentimentConfig, SentimentResolver};
