//! Centralized defaults for the call bot
//!
//! Single source of truth for model tiers, endpoints and fixed strings that
//! more than one crate needs.

/// Speech recognition model tiers
pub mod stt {
    /// Default recognition tier
    pub const DEFAULT_MODEL: &str = "medium";

    /// Used when the default tier fails to load
    pub const FALLBACK_MODEL: &str = "medium";

    /// Strongest tier; escalation never goes past it
    pub const TOP_TIER_MODEL: &str = "large";

    /// Smallest tier, last resort after total failure
    pub const LAST_RESORT_MODEL: &str = "base";

    pub const DEFAULT_LANGUAGE: &str = "fa";

    pub const DEFAULT_INITIAL_PROMPT: &str = "این یک مکالمه فارسی است";

    /// Average log-probability below which a transcript counts as low confidence
    pub const LOW_CONFIDENCE_THRESHOLD: f32 = -1.0;

    /// Transcript handed downstream when every recognition attempt failed
    pub const FAILURE_SENTINEL: &str = "خطا در تشخیص گفتار";

    /// Whisper sidecar
    pub const SIDECAR_DEFAULT: &str = "http://127.0.0.1:9000";
}

/// Audio enhancement
pub mod audio {
    pub const TARGET_SAMPLE_RATE: u32 = 16_000;

    /// Target RMS level (dBFS)
    pub const TARGET_DB: f32 = -20.0;

    /// Synthesized reply sample rate
    pub const TTS_SAMPLE_RATE: u32 = 24_000;
}

/// Sentiment model
pub mod sentiment {
    pub const DEFAULT_MODEL: &str = "cardiffnlp/twitter-xlm-roberta-base-sentiment";

    /// Hugging Face inference API
    pub const INFERENCE_ENDPOINT: &str = "https://api-inference.huggingface.co/models";

    /// Characters sent to the model
    pub const MAX_INPUT_CHARS: usize = 512;
}

/// Language model service
pub mod llm {
    pub const ENDPOINT_DEFAULT: &str = "https://api.metisai.ir/openai/v1";
    pub const MODEL_DEFAULT: &str = "gpt-4.1-mini";
    pub const TEMPERATURE_DEFAULT: f32 = 0.2;
    pub const MAX_TOKENS_DEFAULT: u32 = 256;
    pub const TIMEOUT_SECS_DEFAULT: u64 = 30;
}

/// Speech synthesis
pub mod tts {
    pub const ENGINE: &str = "gemini";
    pub const ENDPOINT_DEFAULT: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const MODEL_DEFAULT: &str = "gemini-2.5-flash-preview-tts";
    pub const VOICE_DEFAULT: &str = "achernar";
    pub const LANG_DEFAULT: &str = "auto";
    pub const RESPONSES_DIR_DEFAULT: &str = "storage/responses";
}

/// Call recordings
pub mod recordings {
    pub const MONITOR_DIR_DEFAULT: &str = "/app/asterisk-monitor";
}
