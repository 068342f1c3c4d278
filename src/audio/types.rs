use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::{AudioError, Result};

/// Decoded audio held in memory as planar PCM
///
/// Every channel is its own `Vec<f32>` with samples in [-1.0, 1.0].
/// All channels have the same length and share one sample rate;
/// the constructors reject anything else, so the fields stay private.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Build a buffer from per-channel sample vectors
    ///
    /// # Example
    /// ```
    /// use audio_trimmer_lib::audio::PcmBuffer;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let stereo = PcmBuffer::new(vec![vec![0.0, 0.1], vec![0.5, 0.6]], 48000)?;
    /// assert_eq!(stereo.channel_count(), 2);
    /// assert_eq!(stereo.frame_count(), 2);
    ///
    /// // Ragged channels are rejected
    /// assert!(PcmBuffer::new(vec![vec![0.0], vec![]], 48000).is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidBuffer(
                "Sample rate must be greater than 0".to_string(),
            ));
        }

        let first_len = match channels.first() {
            Some(channel) => channel.len(),
            None => {
                return Err(AudioError::InvalidBuffer(
                    "Buffer must have at least one channel".to_string(),
                ))
            }
        };

        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, channel)| channel.len() != first_len)
        {
            return Err(AudioError::InvalidBuffer(format!(
                "Channel {} has {} samples, expected {}",
                index,
                channel.len(),
                first_len
            )));
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Build a buffer from interleaved samples: [L, R, L, R, ...]
    pub fn from_interleaved(samples: &[f32], channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(AudioError::InvalidBuffer(
                "Buffer must have at least one channel".to_string(),
            ));
        }

        let channel_count = channels as usize;
        if samples.len() % channel_count != 0 {
            return Err(AudioError::InvalidBuffer(format!(
                "{} interleaved samples do not divide into {} channels",
                samples.len(),
                channel_count
            )));
        }

        let frames = samples.len() / channel_count;
        let mut planar: Vec<Vec<f32>> = (0..channel_count)
            .map(|_| Vec::with_capacity(frames))
            .collect();
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in planar.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Self::new(planar, sample_rate)
    }

    /// Number of channels (1 = mono, 2 = stereo)
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples in each channel
    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Total duration in seconds: frames / sample_rate
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Iterate samples frame by frame, channels interleaved
    pub fn interleaved(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.frame_count())
            .flat_map(move |frame| self.channels.iter().map(move |channel| channel[frame]))
    }
}

/// Metadata about an audio file without loading all samples
///
/// Use this for quick info queries without decoding the entire file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInfo {
    /// Total duration in seconds (0.0 when the container does not say)
    pub duration_seconds: f64,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels (0 when the container does not say)
    pub channels: u16,

    /// Audio codec name as reported by the decoder registry
    pub format: String,

    /// Bit depth if available (e.g., 16, 24)
    pub bit_depth: Option<u16>,
}

/// A start/end window in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimRange {
    /// Start time in seconds (must be >= 0)
    pub start_seconds: f64,

    /// End time in seconds (must be >= start_seconds)
    pub end_seconds: f64,
}

/// A trim range resolved to sample positions in one buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    pub start: usize,
    pub len: usize,
}

impl FrameSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// The seconds this span actually covers at `sample_rate`
    pub fn to_range(&self, sample_rate: u32) -> TrimRange {
        let rate = sample_rate.max(1) as f64;
        TrimRange {
            start_seconds: self.start as f64 / rate,
            end_seconds: self.end() as f64 / rate,
        }
    }
}

impl TrimRange {
    /// Create new trim parameters with validation
    ///
    /// An empty range (start == end) is allowed and yields an empty cut.
    pub fn new(start_seconds: f64, end_seconds: f64) -> Result<Self> {
        let range = Self {
            start_seconds,
            end_seconds,
        };
        range.validate()?;
        Ok(range)
    }

    /// The whole of a source: [0, duration]
    pub fn full(duration_seconds: f64) -> Self {
        Self {
            start_seconds: 0.0,
            end_seconds: duration_seconds.max(0.0),
        }
    }

    /// Get the duration of the trimmed audio
    pub fn trim_duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    fn validate(&self) -> Result<()> {
        if !self.start_seconds.is_finite() || !self.end_seconds.is_finite() {
            return Err(AudioError::InvalidRange(format!(
                "Start ({}) and end ({}) must be finite numbers",
                self.start_seconds, self.end_seconds
            )));
        }

        if self.start_seconds < 0.0 {
            return Err(AudioError::InvalidRange(format!(
                "Start time cannot be negative: {}",
                self.start_seconds
            )));
        }

        if self.end_seconds < self.start_seconds {
            return Err(AudioError::InvalidRange(format!(
                "End time ({}) must not be before start time ({})",
                self.end_seconds, self.start_seconds
            )));
        }

        Ok(())
    }

    /// Resolve this range to sample positions in a buffer of `frame_count` frames
    ///
    /// Start frame = round(start × rate), length = round((end − start) × rate).
    /// An end past the source duration is clamped to it, and the span never
    /// reaches beyond the last frame. A start past the duration is rejected.
    ///
    /// The length equals round((end − start) × rate) only while
    /// start frame + length fits in the buffer. When the start rounds up and
    /// the end sits at (or was clamped to) the duration, the span is cut at
    /// the last frame and comes out one frame short: 2.5s..4.0s at 1 Hz over
    /// 4 frames starts at frame 3 and holds 1 frame, not 2.
    pub fn to_frames(&self, sample_rate: u32, frame_count: usize) -> Result<FrameSpan> {
        self.validate()?;

        if sample_rate == 0 {
            return Err(AudioError::InvalidBuffer(
                "Sample rate must be greater than 0".to_string(),
            ));
        }

        let rate = sample_rate as f64;
        let duration = frame_count as f64 / rate;

        if self.start_seconds > duration {
            return Err(AudioError::InvalidRange(format!(
                "Start time ({}s) exceeds audio duration ({}s)",
                self.start_seconds, duration
            )));
        }

        let end_seconds = self.end_seconds.min(duration);
        let start = ((self.start_seconds * rate).round() as usize).min(frame_count);
        let len = ((end_seconds - self.start_seconds) * rate).round() as usize;

        Ok(FrameSpan {
            start,
            len: len.min(frame_count - start),
        })
    }
}

/// The user's selected file: a display name plus the raw compressed bytes
///
/// Cloning is cheap; the bytes are shared.
#[derive(Debug, Clone)]
pub struct SourceAsset {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl SourceAsset {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk into memory
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| AudioError::FileOpen {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        Ok(Self::new(name, bytes))
    }

    /// File extension, used as a format hint for the decoder
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }

    /// File name without extension
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_and_frames() {
        let audio = PcmBuffer::new(vec![vec![0.0; 44100], vec![0.0; 44100]], 44100).unwrap();
        assert_eq!(audio.frame_count(), 44100);
        assert_eq!(audio.duration_seconds(), 1.0);
    }

    #[test]
    fn test_rejects_bad_layouts() {
        assert!(matches!(
            PcmBuffer::new(vec![], 44100),
            Err(AudioError::InvalidBuffer(_))
        ));
        assert!(matches!(
            PcmBuffer::new(vec![vec![0.0]], 0),
            Err(AudioError::InvalidBuffer(_))
        ));
        assert!(PcmBuffer::from_interleaved(&[0.0, 1.0, 2.0], 2, 8000).is_err());
    }

    #[test]
    fn test_interleave_deinterleave() {
        let audio = PcmBuffer::from_interleaved(&[0.0, 10.0, 1.0, 11.0, 2.0, 12.0], 2, 1).unwrap();
        assert_eq!(audio.channel(0).unwrap(), &[0.0, 1.0, 2.0]);
        assert_eq!(audio.channel(1).unwrap(), &[10.0, 11.0, 12.0]);

        let interleaved: Vec<f32> = audio.interleaved().collect();
        assert_eq!(interleaved, vec![0.0, 10.0, 1.0, 11.0, 2.0, 12.0]);
    }

    #[test]
    fn test_invalid_trim_range() {
        // Start > End
        assert!(TrimRange::new(10.0, 5.0).is_err());

        // Negative start
        assert!(TrimRange::new(-1.0, 5.0).is_err());

        // NaN from an empty form field
        assert!(TrimRange::new(f64::NAN, 5.0).is_err());

        // Empty range is fine
        assert!(TrimRange::new(2.0, 2.0).is_ok());
    }

    #[test]
    fn test_frames_round_consistently() {
        // 0.5 frames at 1 Hz rounds half away from zero
        let span = TrimRange::new(0.5, 2.5).unwrap().to_frames(1, 4).unwrap();
        assert_eq!(span, FrameSpan { start: 1, len: 2 });
    }

    #[test]
    fn test_frames_clamp_end_to_duration() {
        let span = TrimRange::new(1.0, 10.0).unwrap().to_frames(1, 4).unwrap();
        assert_eq!(span, FrameSpan { start: 1, len: 3 });
        assert_eq!(span.end(), 4);
    }

    #[test]
    fn test_frames_never_pass_last_sample() {
        // start rounds up and length rounds up: the span must still fit
        let span = TrimRange::new(1.5, 4.0).unwrap().to_frames(1, 4).unwrap();
        assert!(span.end() <= 4);
    }

    #[test]
    fn test_rounded_start_at_duration_loses_a_frame() {
        // round(2.5) = 3, round(1.5) = 2, but only frame 3 is left
        let span = TrimRange::new(2.5, 4.0).unwrap().to_frames(1, 4).unwrap();
        assert_eq!(span, FrameSpan { start: 3, len: 1 });
    }

    #[test]
    fn test_span_to_range_reports_clamped_seconds() {
        let span = TrimRange::new(0.0, 100.0).unwrap().to_frames(8000, 32000).unwrap();
        assert_eq!(
            span.to_range(8000),
            TrimRange {
                start_seconds: 0.0,
                end_seconds: 4.0
            }
        );
    }

    #[test]
    fn test_start_past_duration_is_invalid() {
        let result = TrimRange::new(5.0, 6.0).unwrap().to_frames(1, 4);
        assert!(matches!(result, Err(AudioError::InvalidRange(_))));
    }

    #[test]
    fn test_source_asset_names() {
        let asset = SourceAsset::new("interview.final.mp3", Vec::new());
        assert_eq!(asset.extension(), Some("mp3"));
        assert_eq!(asset.stem(), "interview.final");
    }
}
