//! Settings for exporting trimmed audio.
//!
//! Nothing here is persisted; the binaries fill it from command-line flags.

use crate::audio::WavFormat;

/// Export settings for a trimming session.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Sample encoding of the exported WAV.
    /// Default: 16-bit PCM.
    pub format: WavFormat,

    /// Appended to the source file stem to name the export.
    /// Default: "-trimmed" (`song.mp3` -> `song-trimmed.wav`).
    pub suffix: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: WavFormat::Pcm16,
            suffix: "-trimmed".to_string(),
        }
    }
}

impl ExportSettings {
    /// Create default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the WAV sample encoding.
    pub fn with_format(mut self, format: WavFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the export name suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// File name for an export of a source with the given stem.
    pub fn export_name(&self, source_stem: &str) -> String {
        format!("{}{}.wav", source_stem, self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_name() {
        assert_eq!(ExportSettings::default().export_name("song"), "song-trimmed.wav");
        assert_eq!(
            ExportSettings::new().with_suffix("_cut").export_name("take 2"),
            "take 2_cut.wav"
        );
    }
}
