//! Mono audio buffer and utilities
//!
//! Samples are stored as f32 normalized to [-1.0, 1.0]. Multi-channel input is
//! mixed down to mono on load.

use std::path::Path;

use crate::{Error, Result};

/// Minimum dB reported for silence
pub const SILENCE_DB: f32 = -96.0;

/// Frames fed to the FFT resampler per call
const RESAMPLE_CHUNK: usize = 1024;

/// PCM16 scaling constant for writing
const PCM16_SCALE: f32 = 32767.0;

/// Mono audio at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Load a WAV file, mixing all channels down to mono
    pub fn read_wav(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        if spec.sample_rate == 0 || spec.channels == 0 {
            return Err(Error::Audio(format!(
                "Invalid WAV header in {}",
                path.display()
            )));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<std::result::Result<_, _>>()?
            },
        };

        let channels = spec.channels as usize;
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };

        tracing::debug!(
            path = %path.display(),
            samples = samples.len(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            "Loaded WAV audio"
        );

        Ok(Self::new(samples, spec.sample_rate))
    }

    /// Write as 16-bit PCM mono WAV
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * PCM16_SCALE) as i16)?;
        }
        writer.finalize()?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Root mean square amplitude
    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }

    /// RMS level in dBFS
    pub fn energy_db(&self) -> f32 {
        let rms = self.rms();
        if rms > 0.0 {
            20.0 * rms.log10()
        } else {
            SILENCE_DB
        }
    }

    /// Largest absolute sample
    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }

    /// Resample with Rubato, falling back to linear interpolation
    pub fn resample(&self, target_rate: u32) -> Self {
        if self.sample_rate == target_rate || self.samples.is_empty() {
            return Self::new(self.samples.clone(), target_rate);
        }

        // Very short buffers are below the FFT resampler's useful range
        if self.samples.len() < 64 {
            return self.resample_linear(target_rate);
        }

        match self.resample_fft(target_rate) {
            Ok(samples) => Self::new(samples, target_rate),
            Err(e) => {
                tracing::warn!("Rubato resampling failed, using linear fallback: {}", e);
                self.resample_linear(target_rate)
            },
        }
    }

    fn resample_fft(&self, target_rate: u32) -> std::result::Result<Vec<f32>, String> {
        use rubato::{FftFixedIn, Resampler};

        let mut resampler = FftFixedIn::<f64>::new(
            self.sample_rate as usize,
            target_rate as usize,
            RESAMPLE_CHUNK,
            2,
            1,
        )
        .map_err(|e| e.to_string())?;

        let input: Vec<f64> = self.samples.iter().map(|&s| s as f64).collect();
        let expected = self.expected_len(target_rate);
        let delay = resampler.output_delay();
        let mut output: Vec<f64> = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

        let mut pos = 0;
        while input.len() - pos >= resampler.input_frames_next() {
            let n = resampler.input_frames_next();
            let frames = resampler
                .process(&[&input[pos..pos + n]], None)
                .map_err(|e| e.to_string())?;
            output.extend_from_slice(&frames[0]);
            pos += n;
        }

        if pos < input.len() {
            let frames = resampler
                .process_partial(Some(&[&input[pos..]]), None)
                .map_err(|e| e.to_string())?;
            output.extend_from_slice(&frames[0]);
        }

        // Flush the resampler's internal delay line
        while output.len() < expected + delay {
            let frames = resampler
                .process_partial(None::<&[&[f64]]>, None)
                .map_err(|e| e.to_string())?;
            if frames[0].is_empty() {
                break;
            }
            output.extend_from_slice(&frames[0]);
        }

        Ok(output
            .into_iter()
            .skip(delay)
            .take(expected)
            .map(|s| s as f32)
            .collect())
    }

    /// Linear interpolation fallback for edge cases
    fn resample_linear(&self, target_rate: u32) -> Self {
        let ratio = target_rate as f64 / self.sample_rate as f64;
        let new_len = self.expected_len(target_rate);
        let last = self.samples.len().saturating_sub(1);

        let mut resampled = Vec::with_capacity(new_len);
        for i in 0..new_len {
            let src_idx = i as f64 / ratio;
            let idx_floor = (src_idx.floor() as usize).min(last);
            let idx_ceil = (idx_floor + 1).min(last);
            let frac = (src_idx - idx_floor as f64) as f32;

            let sample =
                self.samples[idx_floor] * (1.0 - frac) + self.samples[idx_ceil] * frac;
            resampled.push(sample);
        }

        Self::new(resampled, target_rate)
    }

    fn expected_len(&self, target_rate: u32) -> usize {
        (self.samples.len() as f64 * target_rate as f64 / self.sample_rate as f64).round() as usize
    }
}

/// Root mean square of a sample slice (0.0 for empty input)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Largest absolute value of a sample slice
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, secs: f32, amplitude: f32) -> AudioBuffer {
        let n = (rate as f32 * secs) as usize;
        let samples = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * amplitude)
            .collect();
        AudioBuffer::new(samples, rate)
    }

    #[test]
    fn test_rms_of_empty_is_zero() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(AudioBuffer::new(vec![], 16000).energy_db(), SILENCE_DB);
    }

    #[test]
    fn test_sine_rms() {
        let buf = sine(440.0, 16000, 1.0, 1.0);
        assert!((buf.rms() - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.01);
        assert!((buf.peak() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_resample_length() {
        let buf = sine(440.0, 48000, 0.5, 0.5);
        let out = buf.resample(16000);
        assert_eq!(out.sample_rate, 16000);
        assert_eq!(out.samples.len(), 8000);
    }

    #[test]
    fn test_resample_short_buffer_uses_linear() {
        let buf = AudioBuffer::new(vec![0.0, 0.5, 1.0, 0.5], 8000);
        let out = buf.resample(16000);
        assert_eq!(out.samples.len(), 8);
        assert_eq!(out.samples[0], 0.0);
    }

    #[test]
    fn test_wav_round_trip_preserves_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let buf = sine(220.0, 16000, 0.25, 0.5);
        buf.write_wav(&path).unwrap();

        let loaded = AudioBuffer::read_wav(&path).unwrap();
        assert_eq!(loaded.sample_rate, 16000);
        assert_eq!(loaded.samples.len(), buf.samples.len());
        assert!((loaded.rms() - buf.rms()).abs() < 1e-3);
    }

    #[test]
    fn test_stereo_is_mixed_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let loaded = AudioBuffer::read_wav(&path).unwrap();
        assert_eq!(loaded.samples.len(), 100);
        assert!((loaded.samples[0] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let err = AudioBuffer::read_wav("/nonexistent/call.wav").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
