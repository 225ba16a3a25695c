//! Song providers.
//!
//! The player library never looks inside a song. All it needs is a sample
//! rate, a length and the ability to render any stretch of frames on demand,
//! from any thread.

use crate::error::{AudioError, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use std::time::Duration;

/// Number of interleaved output channels. Players always work in stereo.
pub const CHANNELS: u16 = 2;

/// A composition the players can render.
///
/// `render` is called concurrently from several render threads with
/// disjoint ranges, so it must not depend on earlier calls.
pub trait Song: Send + Sync {
    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Total length in stereo frames.
    fn length_frames(&self) -> usize;

    /// Fills `out` with interleaved stereo samples starting at `start_frame`.
    ///
    /// `out.len()` is always even. Frames past the end of the song are silence.
    fn render(&self, start_frame: usize, out: &mut [f32]);

    /// Total length as a duration. Zero when the sample rate is zero.
    fn duration(&self) -> Duration {
        match self.sample_rate() {
            0 => Duration::ZERO,
            rate => Duration::from_secs_f64(self.length_frames() as f64 / rate as f64),
        }
    }
}

/// A song that is already PCM audio held in memory.
#[derive(Debug, Clone)]
pub struct PcmSong {
    sample_rate: u32,
    /// Interleaved stereo samples.
    samples: Vec<f32>,
}

impl PcmSong {
    /// Wraps interleaved stereo samples.
    ///
    /// A trailing half frame is dropped.
    pub fn from_samples(sample_rate: u32, mut samples: Vec<f32>) -> Self {
        samples.truncate(samples.len() / 2 * 2);
        Self {
            sample_rate,
            samples,
        }
    }

    /// Loads a WAV file.
    ///
    /// Integer (8 to 32 bit) and float PCM are accepted. Mono files are
    /// duplicated to both channels.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The file cannot be opened or decoded
    /// - The file has more than two channels or a zero sample rate
    pub fn from_wav<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = WavReader::open(path.as_ref())?;
        let spec = reader.spec();

        if spec.channels == 0 || spec.channels > CHANNELS {
            return Err(AudioError::UnsupportedFormat(format!(
                "{} channels in {}",
                spec.channels,
                path.as_ref().display()
            )));
        }
        if spec.sample_rate == 0 {
            return Err(AudioError::UnsupportedFormat(format!(
                "zero sample rate in {}",
                path.as_ref().display()
            )));
        }

        let decoded: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            SampleFormat::Int => {
                // Scale to -1.0..1.0 from the file's bit depth
                let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let samples = if spec.channels == 1 {
            decoded.iter().flat_map(|&s| [s, s]).collect()
        } else {
            decoded
        };

        tracing::debug!(
            "Loaded {} ({} Hz, {} frames)",
            path.as_ref().display(),
            spec.sample_rate,
            samples.len() / 2
        );

        Ok(Self::from_samples(spec.sample_rate, samples))
    }

    /// Returns the interleaved stereo samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

impl Song for PcmSong {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn length_frames(&self) -> usize {
        self.samples.len() / 2
    }

    fn render(&self, start_frame: usize, out: &mut [f32]) {
        let start = start_frame.saturating_mul(2).min(self.samples.len());
        let available = (self.samples.len() - start).min(out.len());
        out[..available].copy_from_slice(&self.samples[start..start + available]);
        out[available..].fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn ramp(frames: usize) -> Vec<f32> {
        (0..frames * 2).map(|i| i as f32).collect()
    }

    #[test]
    fn test_render_inside_song() {
        let song = PcmSong::from_samples(100, ramp(10));
        let mut out = [0.0; 4];
        song.render(3, &mut out);
        assert_eq!(out, [6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_render_past_end_is_silence() {
        let song = PcmSong::from_samples(100, ramp(4));
        let mut out = [1.0; 6];
        song.render(3, &mut out);
        assert_eq!(out, [6.0, 7.0, 0.0, 0.0, 0.0, 0.0]);

        let mut out = [1.0; 4];
        song.render(100, &mut out);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn test_odd_sample_count_truncated() {
        let song = PcmSong::from_samples(100, vec![0.1, 0.2, 0.3]);
        assert_eq!(song.length_frames(), 1);
        assert_eq!(song.samples(), &[0.1, 0.2]);
    }

    #[test]
    fn test_duration() {
        let song = PcmSong::from_samples(100, ramp(50));
        assert_eq!(song.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_duration_of_zero_rate_song() {
        let song = PcmSong::from_samples(0, ramp(50));
        assert_eq!(song.duration(), Duration::ZERO);
    }

    fn write_stereo_int(path: &Path, bits_per_sample: u16, samples: &[i32]) {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_8_bit_wav() {
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        write_stereo_int(file.path(), 8, &[64, -64, 0, -128]);

        let song = PcmSong::from_wav(file.path()).unwrap();
        assert_eq!(song.samples(), &[0.5, -0.5, 0.0, -1.0]);
    }

    #[test]
    fn test_load_24_bit_wav() {
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        write_stereo_int(file.path(), 24, &[1 << 22, -(1 << 22), 0, -(1 << 23)]);

        let song = PcmSong::from_wav(file.path()).unwrap();
        assert_eq!(song.samples(), &[0.5, -0.5, 0.0, -1.0]);
    }

    #[test]
    fn test_load_mono_wav() {
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        writer.write_sample(16384i16).unwrap();
        writer.write_sample(-16384i16).unwrap();
        writer.finalize().unwrap();

        let song = PcmSong::from_wav(file.path()).unwrap();
        assert_eq!(song.sample_rate(), 22050);
        assert_eq!(song.length_frames(), 2);
        assert_eq!(song.samples(), &[0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_load_float_stereo_wav() {
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        let spec = WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        for s in [0.25f32, -0.25, 0.75, -0.75] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let song = PcmSong::from_wav(file.path()).unwrap();
        assert_eq!(song.length_frames(), 2);
        assert_eq!(song.samples(), &[0.25, -0.25, 0.75, -0.75]);
    }

    #[test]
    fn test_reject_surround_wav() {
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        let spec = WavSpec {
            channels: 4,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        for _ in 0..4 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        assert!(matches!(
            PcmSong::from_wav(file.path()),
            Err(AudioError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_reject_zero_rate_wav() {
        // Canonical 44-byte header for one 16-bit stereo frame at 0 Hz
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&40u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&2u16.to_le_bytes()); // channels
        bytes.extend_from_slice(&0u32.to_le_bytes()); // sample rate
        bytes.extend_from_slice(&0u32.to_le_bytes()); // byte rate
        bytes.extend_from_slice(&4u16.to_le_bytes()); // block align
        bytes.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 0]);

        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        std::fs::write(file.path(), &bytes).unwrap();

        assert!(matches!(
            PcmSong::from_wav(file.path()),
            Err(AudioError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_wav() {
        assert!(matches!(
            PcmSong::from_wav("does/not/exist.wav"),
            Err(AudioError::SongLoad(_))
        ));
    }
}
