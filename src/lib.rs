pub mod audio;
pub mod error;
pub mod resource;
pub mod session;
pub mod settings;

// Re-export for convenience
pub use audio::*;
pub use error::{AudioError, Result};
pub use resource::{Resource, ResourceHandle, ResourceStore};
pub use session::{
    DecodeOutcome, DecodeRequest, DecodeStatus, PreviewTarget, SessionStatus, TrimSession,
};
pub use settings::ExportSettings;
