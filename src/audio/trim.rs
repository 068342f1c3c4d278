// src/audio/trim.rs

use crate::audio::decoder::decode_audio_file;
use crate::audio::encoder::{write_wav, WavFormat};
use crate::audio::types::{PcmBuffer, TrimRange};
use crate::error::Result;
use std::path::Path;

/// Trim audio data to a specific time range
///
/// Copies frames `[round(start × rate), + round((end − start) × rate))` of
/// every channel into a new buffer. The source is never modified. An end
/// past the source duration is clamped; an invalid range fails before any
/// allocation.
///
/// # Arguments
/// * `audio` - The audio data to trim
/// * `range` - Start and end times in seconds
///
/// # Returns
/// New PcmBuffer containing only the trimmed portion
///
/// # Example
/// ```
/// use audio_trimmer_lib::audio::{trim_audio, PcmBuffer, TrimRange};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // 10 seconds of stereo at 44.1kHz
/// let original = PcmBuffer::new(vec![vec![0.5; 441000], vec![0.5; 441000]], 44100)?;
///
/// // Trim from 5 seconds to 10 seconds
/// let range = TrimRange::new(5.0, 10.0)?;
/// let trimmed = trim_audio(&original, &range)?;
///
/// assert_eq!(trimmed.duration_seconds(), 5.0);
/// assert_eq!(trimmed.sample_rate(), 44100);
/// assert_eq!(trimmed.channel_count(), 2);
/// # Ok(())
/// # }
/// ```
pub fn trim_audio(audio: &PcmBuffer, range: &TrimRange) -> Result<PcmBuffer> {
    let span = range.to_frames(audio.sample_rate(), audio.frame_count())?;

    tracing::debug!(
        "Trimming {:.3}s..{:.3}s -> frames {}..{} of {}",
        range.start_seconds,
        range.end_seconds,
        span.start,
        span.end(),
        audio.frame_count()
    );

    let channels = audio
        .channels()
        .iter()
        .map(|channel| channel[span.start..span.end()].to_vec())
        .collect();

    PcmBuffer::new(channels, audio.sample_rate())
}

/// Decode a file, trim it, and write the cut as WAV
///
/// # Example
/// ```no_run
/// use audio_trimmer_lib::audio::{trim_audio_file, TrimRange, WavFormat};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let range = TrimRange::new(5.0, 10.0)?;
/// let trimmed = trim_audio_file("input.mp3", "output.wav", &range, WavFormat::Pcm16)?;
/// println!("Wrote {:.2}s", trimmed.duration_seconds());
/// # Ok(())
/// # }
/// ```
pub fn trim_audio_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input_path: P,
    output_path: Q,
    range: &TrimRange,
    format: WavFormat,
) -> Result<PcmBuffer> {
    let audio = decode_audio_file(input_path)?;
    let trimmed = trim_audio(&audio, range)?;
    write_wav(&trimmed, output_path, format)?;
    Ok(trimmed)
}
