//! Audio enhancer
//!
//! Decode → mono → resample → optional noise reduction → loudness
//! normalization → write a 16-bit WAV into a scoped temporary file.
//!
//! The output file is a [`TempPath`]: it is deleted when the
//! [`EnhancementResult`] is dropped, on every exit path of the caller.

mod noise;

pub use noise::{default_reducer, NoiseReducer};
#[cfg(feature = "noise-suppression")]
pub use noise::RnnoiseReducer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use callbot_config::AudioConfig;
use callbot_core::{audio, AudioBuffer, EnhancementStats};
use tempfile::TempPath;

use crate::PipelineError;

/// Offset added to the RMS before taking the log, so silence stays finite
const RMS_EPSILON: f32 = 1e-9;

/// Enhancer configuration
#[derive(Debug, Clone)]
pub struct EnhancerConfig {
    pub target_sample_rate: u32,
    /// Target RMS level in dBFS
    pub target_db: f32,
    pub noise_reduction: bool,
    /// Directory for temporary output (system temp dir when `None`)
    pub temp_dir: Option<PathBuf>,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: callbot_config::constants::audio::TARGET_SAMPLE_RATE,
            target_db: callbot_config::constants::audio::TARGET_DB,
            noise_reduction: true,
            temp_dir: None,
        }
    }
}

impl From<&AudioConfig> for EnhancerConfig {
    fn from(config: &AudioConfig) -> Self {
        Self {
            target_sample_rate: config.target_sample_rate,
            target_db: config.target_db,
            noise_reduction: config.noise_reduction,
            temp_dir: None,
        }
    }
}

/// Enhanced audio plus diagnostics
///
/// Owns the temporary file; dropping the result deletes it.
#[derive(Debug)]
pub struct EnhancementResult {
    audio: TempPath,
    pub stats: EnhancementStats,
}

impl EnhancementResult {
    pub fn path(&self) -> &Path {
        &self.audio
    }

    /// Delete the temporary file now, reporting failures
    pub fn close(self) -> std::io::Result<()> {
        self.audio.close()
    }
}

/// Scale `samples` in place so their RMS reaches `target_db` dBFS
///
/// If the gained signal would clip, the whole buffer is scaled down so its
/// peak is exactly 1.0. Empty input is left untouched.
pub fn normalize_loudness(samples: &mut [f32], target_db: f32) {
    if samples.is_empty() {
        return;
    }

    let rms = audio::rms(samples) + RMS_EPSILON;
    let current_db = 20.0 * rms.log10();
    let gain = 10f32.powf((target_db - current_db) / 20.0);
    samples.iter_mut().for_each(|s| *s *= gain);

    let peak = audio::peak(samples);
    if peak > 1.0 {
        samples.iter_mut().for_each(|s| *s /= peak);
    }
}

/// Create a uniquely named temporary WAV path
pub(crate) fn temp_wav(dir: Option<&Path>, prefix: &str) -> std::io::Result<TempPath> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix).suffix(".wav");
    let file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    Ok(file.into_temp_path())
}

#[derive(Clone)]
pub struct AudioEnhancer {
    config: EnhancerConfig,
    reducer: Option<Arc<dyn NoiseReducer>>,
}

impl AudioEnhancer {
    pub fn new(config: EnhancerConfig, reducer: Option<Box<dyn NoiseReducer>>) -> Self {
        if config.noise_reduction && reducer.is_none() {
            tracing::info!("Noise reduction requested but no reducer is available in this build");
        }
        Self {
            config,
            reducer: reducer.map(Arc::from),
        }
    }

    /// Enhancer with the reducer compiled into this build
    pub fn with_default_reducer(config: EnhancerConfig) -> Self {
        Self::new(config, default_reducer())
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// [`enhance`](Self::enhance) on the blocking thread pool
    ///
    /// A panicking reducer surfaces as [`PipelineError::Task`].
    pub async fn enhance_blocking(&self, input: &Path) -> Result<EnhancementResult, PipelineError> {
        let enhancer = self.clone();
        let input = input.to_path_buf();
        tokio::task::spawn_blocking(move || enhancer.enhance(&input)).await?
    }

    /// Enhance `input` into a new temporary WAV file
    pub fn enhance(&self, input: &Path) -> Result<EnhancementResult, PipelineError> {
        let decoded = AudioBuffer::read_wav(input)?;
        let mut buffer = decoded.resample(self.config.target_sample_rate);

        let mut noise_reduced = false;
        if self.config.noise_reduction {
            if let Some(reducer) = &self.reducer {
                match reducer.reduce(&buffer) {
                    Ok(reduced) => {
                        buffer = reduced;
                        noise_reduced = true;
                    },
                    Err(e) => {
                        tracing::warn!(
                            reducer = reducer.name(),
                            error = %e,
                            "Noise reduction failed, continuing with resampled audio"
                        );
                    },
                }
            }
        }

        normalize_loudness(&mut buffer.samples, self.config.target_db);

        let out = temp_wav(self.config.temp_dir.as_deref(), "callbot_enh_")?;
        buffer.write_wav(&out)?;

        let stats = EnhancementStats {
            sample_rate: buffer.sample_rate,
            duration_sec: buffer.duration_secs(),
            noise_reduction: noise_reduced,
            target_db: self.config.target_db,
        };

        tracing::debug!(
            input = %input.display(),
            output = %out.display(),
            sample_rate = stats.sample_rate,
            duration_sec = stats.duration_sec,
            noise_reduction = stats.noise_reduction,
            "Audio enhanced"
        );

        Ok(EnhancementResult { audio: out, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingReducer;

    impl NoiseReducer for FailingReducer {
        fn name(&self) -> &str {
            "failing"
        }

        fn reduce(&self, _audio: &AudioBuffer) -> Result<AudioBuffer, PipelineError> {
            Err(PipelineError::NoiseReduction("model missing".to_string()))
        }
    }

    struct PanickingReducer;

    impl NoiseReducer for PanickingReducer {
        fn name(&self) -> &str {
            "panicking"
        }

        fn reduce(&self, _audio: &AudioBuffer) -> Result<AudioBuffer, PipelineError> {
            panic!("denoiser state corrupted")
        }
    }

    struct HalvingReducer;

    impl NoiseReducer for HalvingReducer {
        fn name(&self) -> &str {
            "halving"
        }

        fn reduce(&self, audio: &AudioBuffer) -> Result<AudioBuffer, PipelineError> {
            Ok(AudioBuffer::new(
                audio.samples.iter().map(|s| s * 0.5).collect(),
                audio.sample_rate,
            ))
        }
    }

    fn tone(rate: u32, amplitude: f32) -> AudioBuffer {
        let samples = (0..rate / 2)
            .map(|i| (2.0 * std::f32::consts::PI * 300.0 * i as f32 / rate as f32).sin() * amplitude)
            .collect();
        AudioBuffer::new(samples, rate)
    }

    fn config(dir: &Path) -> EnhancerConfig {
        EnhancerConfig {
            temp_dir: Some(dir.to_path_buf()),
            ..EnhancerConfig::default()
        }
    }

    #[test]
    fn test_normalize_reaches_target() {
        let mut samples = tone(16000, 0.01).samples;
        normalize_loudness(&mut samples, -20.0);
        let db = 20.0 * audio::rms(&samples).log10();
        assert!((db + 20.0).abs() < 0.01);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut samples = tone(16000, 0.3).samples;
        normalize_loudness(&mut samples, -20.0);
        let first = audio::rms(&samples);
        normalize_loudness(&mut samples, -20.0);
        assert!((audio::rms(&samples) - first).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_never_clips() {
        // a single spike: reaching -1 dBFS RMS would push the peak far above 1.0
        let mut samples = vec![0.0f32; 1000];
        samples[10] = 0.01;
        normalize_loudness(&mut samples, -1.0);
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
        assert!((audio::peak(&samples) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_empty_is_noop() {
        let mut samples: Vec<f32> = Vec::new();
        normalize_loudness(&mut samples, -20.0);
        assert!(samples.is_empty());
    }

    #[test]
    fn test_enhance_writes_mono_target_rate() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("call.wav");
        tone(44100, 0.2).write_wav(&input).unwrap();

        let enhancer = AudioEnhancer::new(config(dir.path()), None);
        let result = enhancer.enhance(&input).unwrap();
        assert_eq!(result.stats.sample_rate, 16000);
        assert!(!result.stats.noise_reduction);
        assert!((result.stats.duration_sec - 0.5).abs() < 0.01);

        let written = AudioBuffer::read_wav(result.path()).unwrap();
        assert_eq!(written.sample_rate, 16000);

        let path = result.path().to_path_buf();
        drop(result);
        assert!(!path.exists());
    }

    #[test]
    fn test_reducer_failure_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("call.wav");
        tone(16000, 0.2).write_wav(&input).unwrap();

        let enhancer = AudioEnhancer::new(config(dir.path()), Some(Box::new(FailingReducer)));
        let result = enhancer.enhance(&input).unwrap();
        assert!(!result.stats.noise_reduction);
    }

    #[test]
    fn test_reducer_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("call.wav");
        tone(16000, 0.2).write_wav(&input).unwrap();

        let enhancer = AudioEnhancer::new(config(dir.path()), Some(Box::new(HalvingReducer)));
        assert!(enhancer.enhance(&input).unwrap().stats.noise_reduction);
    }

    #[test]
    fn test_undecodable_input_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("call.wav");
        std::fs::write(&input, b"not a wav file").unwrap();

        let enhancer = AudioEnhancer::new(config(dir.path()), None);
        assert!(enhancer.enhance(&input).is_err());
    }

    #[tokio::test]
    async fn test_enhance_blocking_matches_inline() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("call.wav");
        tone(44100, 0.2).write_wav(&input).unwrap();

        let enhancer = AudioEnhancer::new(config(dir.path()), Some(Box::new(HalvingReducer)));
        let result = enhancer.enhance_blocking(&input).await.unwrap();
        assert_eq!(result.stats.sample_rate, 16000);
        assert!(result.stats.noise_reduction);
        assert!(result.path().exists());
    }

    #[tokio::test]
    async fn test_panicking_reducer_is_an_error_not_a_crash() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("call.wav");
        tone(16000, 0.2).write_wav(&input).unwrap();

        let enhancer = AudioEnhancer::new(config(dir.path()), Some(Box::new(PanickingReducer)));
        let err = enhancer.enhance_blocking(&input).await.unwrap_err();
        assert!(matches!(err, PipelineError::Task(_)), "{:?}", err);

        // only the input remains; the temp output was never created
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
