// src/audio/decoder.rs

use symphonia::core::audio::AudioBufferRef;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use std::fs::File;
use std::io::{Cursor, ErrorKind};
use std::path::Path;

use crate::audio::types::{AudioInfo, PcmBuffer, SourceAsset};
use crate::error::{AudioError, Result};

/// Decodes a selected asset to planar PCM samples in memory
///
/// Supports: MP3, FLAC, WAV, OGG Vorbis, AAC, and more via symphonia.
/// The asset's file extension is passed on as a format hint.
///
/// # Example
/// ```no_run
/// use audio_trimmer_lib::audio::{decode_asset, SourceAsset};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let asset = SourceAsset::from_path("interview.mp3")?;
/// let audio = decode_asset(&asset)?;
/// println!("Loaded {:.1} seconds at {} Hz", audio.duration_seconds(), audio.sample_rate());
/// # Ok(())
/// # }
/// ```
pub fn decode_asset(asset: &SourceAsset) -> Result<PcmBuffer> {
    tracing::debug!("Decoding '{}' ({} bytes)", asset.name, asset.bytes.len());
    decode_source(Box::new(Cursor::new(asset.bytes.clone())), asset.extension())
}

/// Decodes an audio file from disk
pub fn decode_audio_file<P: AsRef<Path>>(path: P) -> Result<PcmBuffer> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| AudioError::FileOpen {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    decode_source(Box::new(file), path.extension().and_then(|e| e.to_str()))
}

/// Decode an asset without blocking the async runtime
///
/// Single-shot: resolves once with the decoded buffer or a `DecodeFailure`.
pub async fn decode_audio_async(asset: SourceAsset) -> Result<PcmBuffer> {
    // Run blocking audio processing in a dedicated thread pool
    tokio::task::spawn_blocking(move || decode_asset(&asset))
        .await
        .map_err(|e| AudioError::TaskJoin(e.to_string()))?
}

/// Get audio metadata without decoding all samples
///
/// Much faster than a full decode when only duration/format are needed
pub fn probe_asset_info(asset: &SourceAsset) -> Result<AudioInfo> {
    probe_source(Box::new(Cursor::new(asset.bytes.clone())), asset.extension())
}

/// Get audio file metadata without decoding all samples
///
/// # Example
/// ```no_run
/// use audio_trimmer_lib::audio::get_audio_info;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let info = get_audio_info("interview.mp3")?;
/// println!("Duration: {:.2} minutes", info.duration_seconds / 60.0);
/// println!("Format: {}", info.format);
/// # Ok(())
/// # }
/// ```
pub fn get_audio_info<P: AsRef<Path>>(path: P) -> Result<AudioInfo> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| AudioError::FileOpen {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    probe_source(Box::new(file), path.extension().and_then(|e| e.to_str()))
}

fn open_format(source: Box<dyn MediaSource>, extension: Option<&str>) -> Result<Box<dyn FormatReader>> {
    // Create a media source stream (buffered reader)
    let mss = MediaSourceStream::new(source, Default::default());

    // Create a hint to help symphonia detect the format
    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::DecodeFailure(format!("Failed to probe format: {}", e)))?;

    Ok(probed.format)
}

fn decode_source(source: Box<dyn MediaSource>, extension: Option<&str>) -> Result<PcmBuffer> {
    let mut format = open_format(source, extension)?;

    // Find the default audio track (skip video/subtitle tracks)
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::DecodeFailure("No audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| AudioError::DecodeFailure("Sample rate not found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::DecodeFailure(format!("Unsupported codec: {}", e)))?;

    // Channel count comes from the first decoded packet; some MP3s don't carry it in metadata
    let mut channels: Vec<Vec<f32>> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(AudioError::DecodeFailure(format!("Failed to read packet: {}", e)))
            }
        };

        // Skip packets from other tracks (e.g., video, album art)
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => append_planes(&decoded, &mut channels)?,
            Err(SymphoniaError::DecodeError(e)) => {
                skipped_packets += 1;
                tracing::warn!("Skipping corrupt packet: {}", e);
            }
            Err(e) => return Err(AudioError::DecodeFailure(format!("Decode error: {}", e))),
        }
    }

    if channels.is_empty() {
        // Nothing decoded: only acceptable for a well-formed empty stream
        let count = codec_params
            .channels
            .map(|c| c.count())
            .filter(|&count| count > 0)
            .ok_or_else(|| AudioError::DecodeFailure("No audio samples decoded".to_string()))?;
        channels = vec![Vec::new(); count];
    }

    tracing::debug!(
        "Decoded {} channels × {} frames at {} Hz ({} packets skipped)",
        channels.len(),
        channels[0].len(),
        sample_rate,
        skipped_packets
    );

    PcmBuffer::new(channels, sample_rate)
}

fn probe_source(source: Box<dyn MediaSource>, extension: Option<&str>) -> Result<AudioInfo> {
    let format = open_format(source, extension)?;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::DecodeFailure("No audio track".to_string()))?;

    let params = &track.codec_params;
    let sample_rate = params.sample_rate.unwrap_or(0);
    let channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);

    // Calculate duration from frame count
    let duration_seconds = match (params.n_frames, params.sample_rate) {
        (Some(n_frames), Some(sr)) if sr > 0 => n_frames as f64 / sr as f64,
        _ => 0.0,
    };

    let format_name = symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map(|descriptor| descriptor.short_name.to_string())
        .unwrap_or_else(|| format!("{:?}", params.codec));

    Ok(AudioInfo {
        duration_seconds,
        sample_rate,
        channels,
        format: format_name,
        bit_depth: params.bits_per_sample.map(|b| b as u16),
    })
}

/// Append one decoded packet to the planar output, converting to f32 in [-1.0, 1.0]
fn append_planes(buffer: &AudioBufferRef<'_>, channels: &mut Vec<Vec<f32>>) -> Result<()> {
    match buffer {
        // Already f32 - just copy
        AudioBufferRef::F32(buf) => extend_planes(buf.planes().planes(), channels, |s| s),
        AudioBufferRef::F64(buf) => extend_planes(buf.planes().planes(), channels, |s| s as f32),

        // Signed integers
        AudioBufferRef::S8(buf) => {
            extend_planes(buf.planes().planes(), channels, |s| s as f32 / 128.0)
        }
        AudioBufferRef::S16(buf) => {
            extend_planes(buf.planes().planes(), channels, |s| s as f32 / 32768.0)
        }
        AudioBufferRef::S24(buf) => extend_planes(buf.planes().planes(), channels, |s| {
            s.inner() as f32 / 8388608.0
        }),
        AudioBufferRef::S32(buf) => extend_planes(buf.planes().planes(), channels, |s| {
            s as f32 / 2147483648.0
        }),

        // Unsigned integers are offset by half their range
        AudioBufferRef::U8(buf) => extend_planes(buf.planes().planes(), channels, |s| {
            (s as f32 - 128.0) / 128.0
        }),
        AudioBufferRef::U16(buf) => extend_planes(buf.planes().planes(), channels, |s| {
            (s as f32 - 32768.0) / 32768.0
        }),
        AudioBufferRef::U24(buf) => extend_planes(buf.planes().planes(), channels, |s| {
            (s.inner() as f32 - 8388608.0) / 8388608.0
        }),
        AudioBufferRef::U32(buf) => extend_planes(buf.planes().planes(), channels, |s| {
            (s as f64 - 2147483648.0) as f32 / 2147483648.0
        }),
    }
}

fn extend_planes<T: Copy>(
    planes: &[&[T]],
    channels: &mut Vec<Vec<f32>>,
    convert: impl Fn(T) -> f32,
) -> Result<()> {
    if channels.is_empty() {
        channels.resize_with(planes.len(), Vec::new);
    }

    if planes.len() != channels.len() {
        return Err(AudioError::DecodeFailure(format!(
            "Channel count changed mid-stream ({} -> {})",
            channels.len(),
            planes.len()
        )));
    }

    for (channel, plane) in channels.iter_mut().zip(planes) {
        channel.extend(plane.iter().map(|&s| convert(s)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encoder::{encode_wav, WavFormat};

    /// Stereo ramp: left rises, right is its mirror
    fn ramp(frames: usize, sample_rate: u32) -> PcmBuffer {
        let left: Vec<f32> = (0..frames).map(|i| i as f32 / frames as f32 - 0.5).collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        PcmBuffer::new(vec![left, right], sample_rate).unwrap()
    }

    fn wav_asset(audio: &PcmBuffer, format: WavFormat) -> SourceAsset {
        SourceAsset::new("ramp.wav", encode_wav(audio, format).unwrap())
    }

    #[test]
    fn test_decode_float_wav_is_exact() {
        let audio = ramp(8000, 8000);
        let decoded = decode_asset(&wav_asset(&audio, WavFormat::Float32)).unwrap();

        assert_eq!(decoded, audio);
    }

    #[test]
    fn test_decode_pcm16_within_one_lsb() {
        let audio = ramp(8000, 8000);
        let decoded = decode_asset(&wav_asset(&audio, WavFormat::Pcm16)).unwrap();

        assert_eq!(decoded.channel_count(), 2);
        assert_eq!(decoded.sample_rate(), 8000);
        assert_eq!(decoded.frame_count(), 8000);

        let lsb = 1.0 / 32768.0;
        for (original, restored) in audio.interleaved().zip(decoded.interleaved()) {
            assert!((original - restored).abs() <= lsb, "{} vs {}", original, restored);
        }
    }

    #[test]
    fn test_probe_reports_duration() {
        let audio = ramp(16000, 8000);
        let info = probe_asset_info(&wav_asset(&audio, WavFormat::Pcm16)).unwrap();

        assert_eq!(info.sample_rate, 8000);
        assert_eq!(info.channels, 2);
        assert_eq!(info.duration_seconds, 2.0);
        assert_eq!(info.bit_depth, Some(16));
    }

    #[test]
    fn test_garbage_is_decode_failure() {
        let asset = SourceAsset::new("noise.mp3", vec![0x42u8; 4096]);
        let result = decode_asset(&asset);

        assert!(matches!(result, Err(AudioError::DecodeFailure(_))));
    }

    #[test]
    fn test_file_not_found() {
        let result = decode_audio_file("/nonexistent/definitely_missing.flac");
        assert!(matches!(result, Err(AudioError::FileOpen { .. })));
    }

    #[test]
    fn test_decode_file_from_disk() {
        let audio = ramp(4000, 8000);
        let path = std::env::temp_dir().join("audio_trimmer_decode_test.wav");
        crate::audio::encoder::write_wav(&audio, &path, WavFormat::Float32).unwrap();

        let decoded = decode_audio_file(&path).unwrap();
        assert_eq!(decoded, audio);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_async_decode_is_single_shot() {
        let audio = ramp(800, 8000);
        let decoded = decode_audio_async(wav_asset(&audio, WavFormat::Float32))
            .await
            .unwrap();
        assert_eq!(decoded.frame_count(), 800);

        let failed = decode_audio_async(SourceAsset::new("broken.ogg", vec![1u8, 2, 3])).await;
        assert!(matches!(failed, Err(AudioError::DecodeFailure(_))));
    }
}
