use thiserror::Error;

/// All possible errors that can occur while loading, trimming and exporting audio
#[derive(Debug, Error)]
pub enum AudioError {
    /// Failed to open or read the audio file from disk
    #[error("Failed to open audio file '{path}': {source}")]
    FileOpen {
        path: String,
        source: std::io::Error,
    },

    /// The input could not be decoded (unsupported or corrupt format)
    #[error("Cannot decode audio: {0}")]
    DecodeFailure(String),

    /// Error occurred while encoding to WAV
    #[error("WAV encoding failed: {0}")]
    EncodeFailed(String),

    /// Requested range is outside [0, duration] or start > end
    #[error("Invalid trim range: {0}")]
    InvalidRange(String),

    /// A trim was requested before any audio finished decoding
    #[error("No audio loaded")]
    NoSourceLoaded,

    /// Download requested before a successful cut
    #[error("Nothing to export yet, cut the audio first")]
    NothingToExport,

    /// The resource handle was already released
    #[error("Resource '{0}' has been revoked")]
    ResourceRevoked(String),

    /// Channel layout or sample rate of a buffer is inconsistent
    #[error("Invalid sample buffer: {0}")]
    InvalidBuffer(String),

    /// Output device or stream failure during preview
    #[error("Playback failed: {0}")]
    Playback(String),

    /// A blocking decode task panicked or was cancelled
    #[error("Task join error: {0}")]
    TaskJoin(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient Result type that uses our AudioError
pub type Result<T> = std::result::Result<T, AudioError>;
