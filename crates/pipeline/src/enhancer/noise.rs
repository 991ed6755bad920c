//! Noise reduction backends

use callbot_core::AudioBuffer;

use crate::PipelineError;

/// Removes stationary background noise from a mono buffer
///
/// Implementations return audio at the same sample rate as the input.
pub trait NoiseReducer: Send + Sync {
    fn name(&self) -> &str;

    fn reduce(&self, audio: &AudioBuffer) -> Result<AudioBuffer, PipelineError>;
}

/// Reducer compiled into this build, if any
pub fn default_reducer() -> Option<Box<dyn NoiseReducer>> {
    #[cfg(feature = "noise-suppression")]
    {
        Some(Box::new(rnnoise::RnnoiseReducer::new()))
    }
    #[cfg(not(feature = "noise-suppression"))]
    {
        None
    }
}

#[cfg(feature = "noise-suppression")]
pub use rnnoise::RnnoiseReducer;

#[cfg(feature = "noise-suppression")]
mod rnnoise {
    use callbot_core::AudioBuffer;
    use nnnoiseless::DenoiseState;

    use super::NoiseReducer;
    use crate::PipelineError;

    /// RNNoise operates on 10 ms frames at 48 kHz
    const RNNOISE_RATE: u32 = 48_000;

    /// RNNoise expects samples in 16-bit integer range
    const I16_SCALE: f32 = 32768.0;

    /// Noise reduction using nnnoiseless (pure Rust RNNoise port)
    ///
    /// Input is resampled to 48 kHz, denoised frame by frame, then resampled
    /// back to the original rate. A fresh denoiser state is used per call.
    #[derive(Debug, Default)]
    pub struct RnnoiseReducer;

    impl RnnoiseReducer {
        pub fn new() -> Self {
            Self
        }
    }

    impl NoiseReducer for RnnoiseReducer {
        fn name(&self) -> &str {
            "rnnoise"
        }

        fn reduce(&self, audio: &AudioBuffer) -> Result<AudioBuffer, PipelineError> {
            if audio.is_empty() {
                return Ok(audio.clone());
            }

            let upsampled = audio.resample(RNNOISE_RATE);
            let mut state = DenoiseState::new();
            let frame = DenoiseState::FRAME_SIZE;

            let mut output = Vec::with_capacity(upsampled.samples.len() + frame);
            let mut in_frame = vec![0.0f32; frame];
            let mut out_frame = vec![0.0f32; frame];

            for chunk in upsampled.samples.chunks(frame) {
                in_frame.iter_mut().for_each(|s| *s = 0.0);
                for (dst, &src) in in_frame.iter_mut().zip(chunk) {
                    *dst = src * I16_SCALE;
                }
                state.process_frame(&mut out_frame, &in_frame);
                output.extend(out_frame[..chunk.len()].iter().map(|&s| s / I16_SCALE));
            }

            if output.iter().any(|s| !s.is_finite()) {
                return Err(PipelineError::NoiseReduction(
                    "denoiser produced non-finite samples".to_string(),
                ));
            }

            Ok(AudioBuffer::new(output, RNNOISE_RATE).resample(audio.sample_rate))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_rnnoise_preserves_rate_and_length() {
            let samples: Vec<f32> = (0..16000).map(|i| ((i % 40) as f32 / 40.0) - 0.5).collect();
            let audio = AudioBuffer::new(samples, 16000);
            let reduced = RnnoiseReducer::new().reduce(&audio).unwrap();
            assert_eq!(reduced.sample_rate, 16000);
            assert_eq!(reduced.samples.len(), audio.samples.len());
        }
    }
}
