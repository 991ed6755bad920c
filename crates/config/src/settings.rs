//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{audio, llm, recordings, sentiment, stt, tts};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Relaxed validation, warnings only
    #[default]
    Development,
    Staging,
    /// All validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// Audio enhancement
    #[serde(default)]
    pub audio: AudioConfig,

    /// Speech recognition
    #[serde(default)]
    pub stt: SttConfig,

    #[serde(default)]
    pub sentiment: SentimentConfig,

    /// Reply generation
    #[serde(default)]
    pub llm: LlmConfig,

    /// Speech synthesis
    #[serde(default)]
    pub tts: TtsConfig,

    /// ScyllaDB persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Where call recordings are picked up from
    #[serde(default)]
    pub recordings: RecordingsConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// -----------------------------------------------------------------------------
// Legacy environment keys
// -----------------------------------------------------------------------------

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(default)
}

/// Accepts 1/0, true/false, yes/no, on/off
pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// -----------------------------------------------------------------------------
// Server
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Default page size for `/api/calls`
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    env_parse("PORT", 8080)
}
fn default_timeout() -> u64 {
    120
}
fn default_true() -> bool {
    true
}
fn default_list_limit() -> usize {
    50
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: default_true(),
            cors_origins: Vec::new(),
            list_limit: default_list_limit(),
        }
    }
}

// -----------------------------------------------------------------------------
// Audio enhancement
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Skip the enhancer entirely when false
    #[serde(default = "default_enhance")]
    pub enhance: bool,

    #[serde(default = "default_target_sample_rate")]
    pub target_sample_rate: u32,

    /// Target RMS level in dBFS
    #[serde(default = "default_target_db")]
    pub target_db: f32,

    #[serde(default = "default_noise_reduction")]
    pub noise_reduction: bool,
}

fn default_enhance() -> bool {
    env_flag("AUDIO_ENHANCE", true)
}
fn default_target_sample_rate() -> u32 {
    env_parse("AUDIO_TARGET_SR", audio::TARGET_SAMPLE_RATE)
}
fn default_target_db() -> f32 {
    env_parse("AUDIO_TARGET_DB", audio::TARGET_DB)
}
fn default_noise_reduction() -> bool {
    env_flag("AUDIO_NOISE_REDUCTION", true)
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enhance: default_enhance(),
            target_sample_rate: default_target_sample_rate(),
            target_db: default_target_db(),
            noise_reduction: default_noise_reduction(),
        }
    }
}

// -----------------------------------------------------------------------------
// Speech recognition
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Whisper sidecar base URL
    #[serde(default = "default_stt_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_stt_model")]
    pub model: String,

    /// Loaded when `model` fails to load
    #[serde(default = "default_stt_fallback_model")]
    pub fallback_model: String,

    #[serde(default = "default_stt_top_tier")]
    pub top_tier_model: String,

    #[serde(default = "default_stt_last_resort")]
    pub last_resort_model: String,

    #[serde(default = "default_stt_language")]
    pub language: String,

    /// Resample to mono 16 kHz before recognition
    #[serde(default = "default_stt_preprocess")]
    pub preprocess: bool,

    #[serde(default = "default_beam_size")]
    pub beam_size: u32,

    #[serde(default = "default_best_of")]
    pub best_of: u32,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_compression_ratio")]
    pub compression_ratio_threshold: f32,

    #[serde(default = "default_logprob_threshold")]
    pub logprob_threshold: f32,

    #[serde(default = "default_no_speech_threshold")]
    pub no_speech_threshold: f32,

    #[serde(default = "default_condition_on_previous")]
    pub condition_on_previous_text: bool,

    #[serde(default = "default_initial_prompt")]
    pub initial_prompt: String,

    /// Retry with the top tier when confidence is low
    #[serde(default = "default_escalate")]
    pub escalate_on_low_confidence: bool,

    #[serde(default = "default_low_confidence_threshold")]
    pub low_confidence_threshold: f32,

    /// Per-request timeout towards the sidecar
    #[serde(default = "default_stt_timeout")]
    pub timeout_seconds: u64,
}

fn default_stt_endpoint() -> String {
    env_string("WHISPER_URL", stt::SIDECAR_DEFAULT)
}
fn default_stt_model() -> String {
    env_string("WHISPER_MODEL", stt::DEFAULT_MODEL)
}
fn default_stt_fallback_model() -> String {
    env_string("WHISPER_FALLBACK_MODEL", stt::FALLBACK_MODEL)
}
fn default_stt_top_tier() -> String {
    stt::TOP_TIER_MODEL.to_string()
}
fn default_stt_last_resort() -> String {
    stt::LAST_RESORT_MODEL.to_string()
}
fn default_stt_language() -> String {
    env_string("WHISPER_LANGUAGE", stt::DEFAULT_LANGUAGE)
}
fn default_stt_preprocess() -> bool {
    env_flag("WHISPER_PREPROCESS", true)
}
fn default_beam_size() -> u32 {
    env_parse("WHISPER_BEAM_SIZE", 5)
}
fn default_best_of() -> u32 {
    env_parse("WHISPER_BEST_OF", 5)
}
fn default_compression_ratio() -> f32 {
    env_parse("WHISPER_COMPRESSION_RATIO", 2.4)
}
fn default_logprob_threshold() -> f32 {
    env_parse("WHISPER_LOGPROB_THRESHOLD", -1.0)
}
fn default_no_speech_threshold() -> f32 {
    env_parse("WHISPER_NO_SPEECH_THRESHOLD", 0.6)
}
fn default_condition_on_previous() -> bool {
    env_flag("WHISPER_CONDITION_ON_PREVIOUS", true)
}
fn default_initial_prompt() -> String {
    env_string("WHISPER_INITIAL_PROMPT", stt::DEFAULT_INITIAL_PROMPT)
}
fn default_escalate() -> bool {
    env_flag("WHISPER_TRY_LARGE_ON_LOW_CONF", true)
}
fn default_low_confidence_threshold() -> f32 {
    stt::LOW_CONFIDENCE_THRESHOLD
}
fn default_stt_timeout() -> u64 {
    300
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            endpoint: default_stt_endpoint(),
            model: default_stt_model(),
            fallback_model: default_stt_fallback_model(),
            top_tier_model: default_stt_top_tier(),
            last_resort_model: default_stt_last_resort(),
            language: default_stt_language(),
            preprocess: default_stt_preprocess(),
            beam_size: default_beam_size(),
            best_of: default_best_of(),
            temperature: 0.0,
            compression_ratio_threshold: default_compression_ratio(),
            logprob_threshold: default_logprob_threshold(),
            no_speech_threshold: default_no_speech_threshold(),
            condition_on_previous_text: default_condition_on_previous(),
            initial_prompt: default_initial_prompt(),
            escalate_on_low_confidence: default_escalate(),
            low_confidence_threshold: default_low_confidence_threshold(),
            timeout_seconds: default_stt_timeout(),
        }
    }
}

// -----------------------------------------------------------------------------
// Sentiment
// -----------------------------------------------------------------------------

/// Sentiment resolution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SentimentStrategy {
    /// Keyword tables only
    #[serde(alias = "keyword")]
    Lexical,
    /// Pretrained model only, lexical on failure
    #[serde(rename = "hf", alias = "model")]
    Model,
    /// Lexical first, model only on a neutral result
    #[default]
    Hybrid,
}

impl SentimentStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lexical => "keyword",
            Self::Model => "hf",
            Self::Hybrid => "hybrid",
        }
    }

    /// True when the strategy may call the sentiment model
    pub fn uses_model(&self) -> bool {
        !matches!(self, Self::Lexical)
    }
}

impl FromStr for SentimentStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" | "lexical" => Ok(Self::Lexical),
            "hf" | "model" => Ok(Self::Model),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(ConfigError::InvalidValue {
                field: "sentiment.strategy".to_string(),
                message: format!("unknown strategy '{}' (keyword, hf, hybrid)", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    #[serde(default = "default_sentiment_strategy")]
    pub strategy: SentimentStrategy,

    #[serde(default = "default_sentiment_model")]
    pub model: String,

    /// Inference endpoint; the model name is appended
    #[serde(default = "default_sentiment_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_sentiment_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_sentiment_max_chars")]
    pub max_input_chars: usize,

    #[serde(default = "default_sentiment_timeout")]
    pub timeout_seconds: u64,
}

fn default_sentiment_strategy() -> SentimentStrategy {
    env_optional("SENTIMENT_BACKEND")
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}
fn default_sentiment_model() -> String {
    env_string("SENTIMENT_MODEL_NAME", sentiment::DEFAULT_MODEL)
}
fn default_sentiment_endpoint() -> String {
    env_string("SENTIMENT_ENDPOINT", sentiment::INFERENCE_ENDPOINT)
}
fn default_sentiment_api_key() -> Option<String> {
    env_optional("HF_API_TOKEN")
}
fn default_sentiment_max_chars() -> usize {
    sentiment::MAX_INPUT_CHARS
}
fn default_sentiment_timeout() -> u64 {
    10
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            strategy: default_sentiment_strategy(),
            model: default_sentiment_model(),
            endpoint: default_sentiment_endpoint(),
            api_key: default_sentiment_api_key(),
            max_input_chars: default_sentiment_max_chars(),
            timeout_seconds: default_sentiment_timeout(),
        }
    }
}

// -----------------------------------------------------------------------------
// Reply generation
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL (without `/chat/completions`)
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Bearer token; a missing key aborts every call
    #[serde(default = "default_llm_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

fn default_llm_endpoint() -> String {
    env_string("METIS_API_BASE", llm::ENDPOINT_DEFAULT)
}
fn default_llm_model() -> String {
    env_string("METIS_MODEL", llm::MODEL_DEFAULT)
}
fn default_llm_api_key() -> Option<String> {
    env_optional("METIS_API_KEY")
}
fn default_llm_temperature() -> f32 {
    llm::TEMPERATURE_DEFAULT
}
fn default_llm_max_tokens() -> u32 {
    llm::MAX_TOKENS_DEFAULT
}
fn default_llm_timeout() -> u64 {
    llm::TIMEOUT_SECS_DEFAULT
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: default_llm_api_key(),
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

// -----------------------------------------------------------------------------
// Speech synthesis
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_tts_enabled")]
    pub enabled: bool,

    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_tts_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_tts_model")]
    pub model: String,

    #[serde(default = "default_tts_voice")]
    pub voice: String,

    /// Language hint; "auto" lets the engine detect it
    #[serde(default = "default_tts_lang")]
    pub lang: String,

    #[serde(default = "default_responses_dir")]
    pub responses_dir: PathBuf,

    #[serde(default = "default_tts_timeout")]
    pub timeout_seconds: u64,
}

fn default_tts_enabled() -> bool {
    env_flag("ENABLE_TTS", false)
}
fn default_tts_endpoint() -> String {
    env_string("GEMINI_API_BASE", tts::ENDPOINT_DEFAULT)
}
fn default_tts_api_key() -> Option<String> {
    env_optional("GEMINI_API_KEY")
}
fn default_tts_model() -> String {
    env_string("GEMINI_TTS_MODEL", tts::MODEL_DEFAULT)
}
fn default_tts_voice() -> String {
    env_string("GEMINI_TTS_VOICE", tts::VOICE_DEFAULT)
}
fn default_tts_lang() -> String {
    env_string("TTS_LANG", tts::LANG_DEFAULT)
}
fn default_responses_dir() -> PathBuf {
    PathBuf::from(env_string("RESPONSES_DIR", tts::RESPONSES_DIR_DEFAULT))
}
fn default_tts_timeout() -> u64 {
    60
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: default_tts_enabled(),
            endpoint: default_tts_endpoint(),
            api_key: default_tts_api_key(),
            model: default_tts_model(),
            voice: default_tts_voice(),
            lang: default_tts_lang(),
            responses_dir: default_responses_dir(),
            timeout_seconds: default_tts_timeout(),
        }
    }
}

// -----------------------------------------------------------------------------
// Persistence
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable ScyllaDB persistence (false = in-memory only)
    #[serde(default = "default_persistence_enabled")]
    pub enabled: bool,

    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_persistence_enabled() -> bool {
    env_flag("SCYLLA_ENABLED", false)
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec!["127.0.0.1:9042".to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "callbot".to_string())
}

fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_persistence_enabled(),
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

// -----------------------------------------------------------------------------
// Recordings
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingsConfig {
    /// Directory the PBX writes call recordings into
    #[serde(default = "default_monitor_dir")]
    pub monitor_dir: PathBuf,
}

fn default_monitor_dir() -> PathBuf {
    PathBuf::from(env_string(
        "ASTERISK_MONITOR_DIR",
        recordings::MONITOR_DIR_DEFAULT,
    ))
}

impl Default for RecordingsConfig {
    fn default() -> Self {
        Self {
            monitor_dir: default_monitor_dir(),
        }
    }
}

// -----------------------------------------------------------------------------
// Observability
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// Serve Prometheus metrics on `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_audio()?;
        self.validate_stt()?;
        self.validate_sentiment()?;
        self.validate_llm()?;
        self.validate_tts()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "Port cannot be 0"));
        }
        if self.server.timeout_seconds == 0 {
            return Err(invalid(
                "server.timeout_seconds",
                "Timeout must be at least 1 second",
            ));
        }
        if self.server.list_limit == 0 {
            return Err(invalid("server.list_limit", "Must be at least 1"));
        }
        Ok(())
    }

    fn validate_audio(&self) -> Result<(), ConfigError> {
        let audio = &self.audio;
        if audio.target_sample_rate < 8_000 || audio.target_sample_rate > 48_000 {
            return Err(invalid(
                "audio.target_sample_rate",
                format!(
                    "Must be between 8000 and 48000, got {}",
                    audio.target_sample_rate
                ),
            ));
        }
        if !audio.target_db.is_finite() || audio.target_db > 0.0 {
            return Err(invalid(
                "audio.target_db",
                format!("Must be a finite dBFS value <= 0, got {}", audio.target_db),
            ));
        }
        Ok(())
    }

    fn validate_stt(&self) -> Result<(), ConfigError> {
        let stt = &self.stt;
        for (field, value) in [
            ("stt.model", &stt.model),
            ("stt.fallback_model", &stt.fallback_model),
            ("stt.top_tier_model", &stt.top_tier_model),
            ("stt.last_resort_model", &stt.last_resort_model),
            ("stt.language", &stt.language),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(field, "Cannot be empty"));
            }
        }
        if stt.beam_size == 0 {
            return Err(invalid("stt.beam_size", "Must be at least 1"));
        }
        if stt.best_of == 0 {
            return Err(invalid("stt.best_of", "Must be at least 1"));
        }
        if !(0.0..=1.0).contains(&stt.temperature) {
            return Err(invalid(
                "stt.temperature",
                format!("Must be between 0.0 and 1.0, got {}", stt.temperature),
            ));
        }
        if !(0.0..=1.0).contains(&stt.no_speech_threshold) {
            return Err(invalid(
                "stt.no_speech_threshold",
                format!(
                    "Must be between 0.0 and 1.0, got {}",
                    stt.no_speech_threshold
                ),
            ));
        }
        if stt.low_confidence_threshold > 0.0 {
            return Err(invalid(
                "stt.low_confidence_threshold",
                "Log-probability threshold must be <= 0",
            ));
        }
        Ok(())
    }

    fn validate_sentiment(&self) -> Result<(), ConfigError> {
        if self.sentiment.max_input_chars == 0 {
            return Err(invalid("sentiment.max_input_chars", "Must be at least 1"));
        }
        if self.sentiment.strategy.uses_model() && self.sentiment.model.trim().is_empty() {
            return Err(invalid(
                "sentiment.model",
                "Model name is required for the hf and hybrid strategies",
            ));
        }
        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(invalid(
                "llm.temperature",
                format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            ));
        }
        if llm.max_tokens == 0 {
            return Err(invalid("llm.max_tokens", "Must be at least 1"));
        }
        if llm.timeout_seconds == 0 {
            return Err(invalid("llm.timeout_seconds", "Must be at least 1 second"));
        }

        // The credential is checked per call; only strict environments refuse to start
        if llm.api_key.is_none() {
            if self.environment.is_strict() {
                return Err(ConfigError::MissingField("llm.api_key".to_string()));
            }
            tracing::warn!("llm.api_key is not set; every call will abort at reply generation");
        }
        Ok(())
    }

    fn validate_tts(&self) -> Result<(), ConfigError> {
        if !self.tts.enabled {
            return Ok(());
        }
        if self.tts.voice.trim().is_empty() {
            return Err(invalid("tts.voice", "Cannot be empty when TTS is enabled"));
        }
        if self.tts.api_key.is_none() {
            tracing::warn!("TTS is enabled but tts.api_key is not set; synthesis will be skipped");
        }
        Ok(())
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Load settings from files and environment
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name("config/default").required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("CALLBOT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
