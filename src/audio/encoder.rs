// src/audio/encoder.rs

use hound::{SampleFormat, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use std::str::FromStr;

use crate::audio::types::PcmBuffer;
use crate::error::{AudioError, Result};

/// Sample encoding of the exported WAV data chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WavFormat {
    /// 16-bit signed integer PCM, playable everywhere
    #[default]
    Pcm16,
    /// 32-bit IEEE float, lossless for decoded f32 samples
    Float32,
}

impl WavFormat {
    pub fn bits_per_sample(self) -> u16 {
        match self {
            WavFormat::Pcm16 => 16,
            WavFormat::Float32 => 32,
        }
    }

    fn spec(self, channels: u16, sample_rate: u32) -> WavSpec {
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: self.bits_per_sample(),
            sample_format: match self {
                WavFormat::Pcm16 => SampleFormat::Int,
                WavFormat::Float32 => SampleFormat::Float,
            },
        }
    }
}

impl fmt::Display for WavFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WavFormat::Pcm16 => write!(f, "pcm16"),
            WavFormat::Float32 => write!(f, "float32"),
        }
    }
}

impl FromStr for WavFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pcm16" | "16" | "int16" => Ok(WavFormat::Pcm16),
            "float32" | "32f" | "f32" => Ok(WavFormat::Float32),
            other => Err(format!(
                "Unknown WAV format '{}' (expected pcm16 or float32)",
                other
            )),
        }
    }
}

/// Quantize one f32 sample to 16-bit PCM
///
/// Full scale is 32768 so that decoding with `/ 32768` is off by at most
/// half a step, and by one step only for +1.0 which saturates to 32767.
pub fn quantize_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32768.0)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Encode PCM audio into an in-memory WAV byte stream
///
/// The result is a complete RIFF/WAVE file: header with channel count,
/// sample rate and bit depth, then interleaved samples.
///
/// # Example
/// ```
/// use audio_trimmer_lib::audio::{encode_wav, PcmBuffer, WavFormat};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let audio = PcmBuffer::new(vec![vec![0.0, 0.5, -0.5, 1.0, -1.0]], 44100)?;
/// let bytes = encode_wav(&audio, WavFormat::Pcm16)?;
///
/// assert_eq!(&bytes[0..4], b"RIFF");
/// assert_eq!(&bytes[8..12], b"WAVE");
/// # Ok(())
/// # }
/// ```
pub fn encode_wav(audio: &PcmBuffer, format: WavFormat) -> Result<Vec<u8>> {
    let spec = format.spec(channel_count(audio)?, audio.sample_rate());
    let mut cursor = Cursor::new(Vec::new());

    let mut writer = WavWriter::new(&mut cursor, spec).map_err(encode_failed)?;
    write_samples(&mut writer, audio, format)?;
    writer.finalize().map_err(encode_failed)?;

    Ok(cursor.into_inner())
}

/// Encode PCM audio to a WAV file on disk
pub fn write_wav<P: AsRef<Path>>(audio: &PcmBuffer, output_path: P, format: WavFormat) -> Result<()> {
    let spec = format.spec(channel_count(audio)?, audio.sample_rate());

    let mut writer = WavWriter::create(output_path, spec).map_err(encode_failed)?;
    write_samples(&mut writer, audio, format)?;

    // Finalize the file (writes headers, etc.)
    writer.finalize().map_err(encode_failed)?;

    Ok(())
}

fn channel_count(audio: &PcmBuffer) -> Result<u16> {
    u16::try_from(audio.channel_count()).map_err(|_| {
        AudioError::EncodeFailed(format!("Too many channels: {}", audio.channel_count()))
    })
}

fn write_samples<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    audio: &PcmBuffer,
    format: WavFormat,
) -> Result<()> {
    match format {
        WavFormat::Pcm16 => {
            for sample in audio.interleaved() {
                writer.write_sample(quantize_i16(sample)).map_err(encode_failed)?;
            }
        }
        WavFormat::Float32 => {
            for sample in audio.interleaved() {
                writer.write_sample(sample).map_err(encode_failed)?;
            }
        }
    }

    Ok(())
}

fn encode_failed(e: hound::Error) -> AudioError {
    AudioError::EncodeFailed(e.to_string())
}
