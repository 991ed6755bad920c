//! Core traits for the call-processing pipeline
//!
//! Every external dependency of the pipeline sits behind one of these traits
//! so backends can be swapped by configuration and replaced by fakes in tests.
//!
//! ```text
//! Speech:
//!   - SpeechBackend / SpeechModel: load a named recognition model, transcribe a file
//!   - SpeechSynthesisBackend: text → raw PCM16 samples
//!
//! Classification:
//!   - SentimentBackend: strong-model sentiment labelling
//!
//! Storage:
//!   - CallRecordStore: append-only call record persistence
//! ```

mod sentiment;
mod speech;
mod store;

pub use sentiment::{SentimentBackend, SentimentLabel};
pub use speech::{
    DecodingOptions, RawTranscript, RecognitionRequest, SpeechBackend, SpeechModel,
    SpeechSynthesisBackend, SynthesisRequest,
};
pub use store::CallRecordStore;
