// src/audio/mod.rs

pub mod decoder;
pub mod encoder;
#[cfg(feature = "playback")]
pub mod playback;
pub mod trim;
pub mod types;

// Re-export commonly used items
pub use decoder::{
    decode_asset, decode_audio_async, decode_audio_file, get_audio_info, probe_asset_info,
};
pub use encoder::{encode_wav, write_wav, WavFormat};
#[cfg(feature = "playback")]
pub use playback::AudioPlayer;
pub use trim::{trim_audio, trim_audio_file};
pub use types::{AudioInfo, FrameSpan, PcmBuffer, SourceAsset, TrimRange};
