//! WAV file ingestion for file mode and test fixtures.
//!
//! Decodes a WAV file to normalized mono `f32` at the pipeline's sample
//! rate, then yields fixed-size chunks suitable for
//! [`PipelineHandle::push_samples`](crate::pipeline::PipelineHandle::push_samples).

use crate::error::{Result, VoxgateError};
use std::io::Read;
use std::path::Path;

/// Decoded WAV audio, iterated as fixed-size sample chunks.
///
/// Supports arbitrary sample rates and channel counts: channels are averaged
/// to mono and the result is linearly resampled to `target_rate`. Both
/// 16-bit integer and 32-bit float WAV files are accepted.
pub struct WavInput {
    samples: Vec<f32>,
    position: usize,
    chunk_size: usize,
}

impl WavInput {
    /// Decode WAV data from any reader.
    pub fn from_reader(
        reader: Box<dyn Read + Send>,
        target_rate: u32,
        chunk_size: usize,
    ) -> Result<Self> {
        let mut wav_reader = hound::WavReader::new(reader).map_err(|e| VoxgateError::Wav {
            message: format!("Failed to parse WAV file: {}", e),
        })?;

        let spec = wav_reader.spec();
        let source_rate = spec.sample_rate;
        let channels = spec.channels.max(1) as usize;

        // Read all samples, normalizing to f32 in [-1.0, 1.0]
        let raw_samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => wav_reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| VoxgateError::Wav {
                    message: format!("Failed to read WAV samples: {}", e),
                })?,
            hound::SampleFormat::Int => wav_reader
                .samples::<i16>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| VoxgateError::Wav {
                    message: format!("Failed to read WAV samples: {}", e),
                })?
                .into_iter()
                .map(|s| s as f32 / 32768.0)
                .collect(),
        };

        // Average channels down to mono
        let mono_samples: Vec<f32> = if channels == 1 {
            raw_samples
        } else {
            raw_samples
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        // Resample to the pipeline rate if needed
        let samples = if source_rate != target_rate {
            resample(&mono_samples, source_rate, target_rate)
        } else {
            mono_samples
        };

        Ok(Self {
            samples,
            position: 0,
            chunk_size,
        })
    }

    /// Decode a WAV file from disk.
    pub fn from_path(path: &Path, target_rate: u32, chunk_size: usize) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(Box::new(std::io::BufReader::new(file)), target_rate, chunk_size)
    }

    /// Total number of decoded samples.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Duration of the decoded audio in milliseconds at `rate`.
    pub fn duration_ms(&self, rate: u32) -> u64 {
        if rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / rate as u64
    }

    /// Consume the input and return all samples as a single buffer.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

impl Iterator for WavInput {
    type Item = Vec<f32>;

    /// The final chunk may be shorter than `chunk_size`; the batcher's
    /// drop-partial policy decides what happens to the tail.
    fn next(&mut self) -> Option<Vec<f32>> {
        if self.position >= self.samples.len() {
            return None;
        }

        let end = std::cmp::min(self.position + self.chunk_size, self.samples.len());
        let chunk = self.samples[self.position..end].to_vec();
        self.position = end;

        Some(chunk)
    }
}

/// Simple linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_wav_data(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    fn make_float_wav_data(sample_rate: u32, samples: &[f32]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_16khz_mono_int_is_normalized() {
        let wav_data = make_wav_data(16000, 1, &[0i16, 16384, -16384, 32767]);

        let input = WavInput::from_reader(Box::new(Cursor::new(wav_data)), 16000, 1600).unwrap();
        let samples = input.into_samples();

        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 0.5).abs() < 1e-4);
        assert!((samples[2] + 0.5).abs() < 1e-4);
        assert!((samples[3] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_float_wav_passes_through() {
        let wav_data = make_float_wav_data(16000, &[0.25, -0.75]);

        let input = WavInput::from_reader(Box::new(Cursor::new(wav_data)), 16000, 1600).unwrap();
        let samples = input.into_samples();

        assert_eq!(samples, vec![0.25, -0.75]);
    }

    #[test]
    fn test_stereo_downmixes_to_mono() {
        // Stereo pairs: (1000, 3000), (-2000, 2000)
        let wav_data = make_wav_data(16000, 2, &[1000, 3000, -2000, 2000]);

        let input = WavInput::from_reader(Box::new(Cursor::new(wav_data)), 16000, 1600).unwrap();
        let samples = input.into_samples();

        assert_eq!(samples.len(), 2);
        assert!((samples[0] - 2000.0 / 32768.0).abs() < 1e-4);
        assert!(samples[1].abs() < 1e-4);
    }

    #[test]
    fn test_48khz_resamples_to_16khz() {
        let input_samples = vec![0i16; 48000]; // 1 second at 48kHz
        let wav_data = make_wav_data(48000, 1, &input_samples);

        let input = WavInput::from_reader(Box::new(Cursor::new(wav_data)), 16000, 1600).unwrap();

        assert!(input.sample_count() >= 15900 && input.sample_count() <= 16100);
    }

    #[test]
    fn test_iterator_yields_fixed_chunks_then_tail() {
        let wav_data = make_wav_data(16000, 1, &vec![1i16; 5000]);

        let input = WavInput::from_reader(Box::new(Cursor::new(wav_data)), 16000, 1600).unwrap();
        let chunks: Vec<Vec<f32>> = input.collect();

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].len(), 1600);
        assert_eq!(chunks[1].len(), 1600);
        assert_eq!(chunks[2].len(), 1600);
        assert_eq!(chunks[3].len(), 200);
    }

    #[test]
    fn test_duration_ms() {
        let wav_data = make_wav_data(16000, 1, &vec![0i16; 8000]);
        let input = WavInput::from_reader(Box::new(Cursor::new(wav_data)), 16000, 1600).unwrap();

        assert_eq!(input.duration_ms(16000), 500);
    }

    #[test]
    fn test_invalid_wav_data_returns_error() {
        let invalid_data = vec![0u8, 1, 2, 3, 4, 5];

        let result = WavInput::from_reader(Box::new(Cursor::new(invalid_data)), 16000, 1600);

        assert!(result.is_err());
        match result {
            Err(VoxgateError::Wav { message }) => {
                assert!(message.contains("Failed to parse WAV file"));
            }
            _ => panic!("Expected Wav error"),
        }
    }

    #[test]
    fn test_truncated_header_returns_error() {
        let truncated = b"RIFF\x00\x00";
        let result =
            WavInput::from_reader(Box::new(Cursor::new(truncated.to_vec())), 16000, 1600);

        assert!(result.is_err(), "Should reject truncated WAV header");
    }

    #[test]
    fn test_all_zero_garbage_returns_error() {
        let zeros = vec![0u8; 1000];
        let result = WavInput::from_reader(Box::new(Cursor::new(zeros)), 16000, 1600);

        assert!(result.is_err(), "Should reject all-zero data");
    }

    #[test]
    fn test_resample_identity_same_rate() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn test_resample_upsample_interpolates() {
        let samples = vec![0.0, 0.5, 1.0];
        let resampled = resample(&samples, 8000, 16000);

        assert_eq!(resampled.len(), 6);
        assert_eq!(resampled[0], 0.0);
        assert!(resampled[1] > 0.0 && resampled[1] < 0.5);
        assert!((resampled[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_resample_downsample_halves_count() {
        let samples = vec![0.0f32; 3200];
        assert_eq!(resample(&samples, 16000, 8000).len(), 1600);
    }

    #[test]
    fn test_resample_handles_empty_and_single() {
        assert!(resample(&[], 16000, 8000).is_empty());

        let single = resample(&[0.7], 16000, 8000);
        assert_eq!(single, vec![0.7]);
    }
}
