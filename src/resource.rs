//! Transient, revocable handles to in-memory byte streams
//!
//! A [`ResourceHandle`] plays the part of a browser object URL: it names a
//! blob (the selected source for preview, or an exported WAV for download)
//! until it is revoked. The [`ResourceStore`] owns the bytes; revoking a
//! handle frees them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{AudioError, Result};

pub const WAV_MIME: &str = "audio/wav";

/// Opaque reference to a live resource, displayed as `blob:audio-trimmer/<n>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:audio-trimmer/{}", self.0)
    }
}

/// Bytes plus what a downloader needs to know about them
#[derive(Debug, Clone)]
pub struct Resource {
    /// Suggested file name for a download
    pub name: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl Resource {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// An encoded WAV export
    pub fn wav(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, WAV_MIME, bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Guess a MIME type from a file extension, for preview handles
pub fn mime_for_extension(extension: Option<&str>) -> &'static str {
    match extension.map(str::to_ascii_lowercase).as_deref() {
        Some("wav") | Some("wave") => WAV_MIME,
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg") | Some("oga") | Some("opus") => "audio/ogg",
        Some("m4a") | Some("mp4") | Some("aac") => "audio/mp4",
        Some("aif") | Some("aiff") => "audio/aiff",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

/// Owner of every live resource in a session
#[derive(Debug, Default)]
pub struct ResourceStore {
    next_id: u64,
    live: BTreeMap<ResourceHandle, Resource>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource and hand out a fresh handle
    pub fn create(&mut self, resource: Resource) -> ResourceHandle {
        self.next_id += 1;
        let handle = ResourceHandle(self.next_id);
        tracing::debug!(
            "Created {} ({}, {} bytes)",
            handle,
            resource.mime,
            resource.len()
        );
        self.live.insert(handle, resource);
        handle
    }

    pub fn get(&self, handle: &ResourceHandle) -> Option<&Resource> {
        self.live.get(handle)
    }

    /// Release a handle. Returns false if it was already released.
    pub fn revoke(&mut self, handle: &ResourceHandle) -> bool {
        let released = self.live.remove(handle).is_some();
        if released {
            tracing::debug!("Revoked {}", handle);
        }
        released
    }

    /// Release everything; returns how many handles were live
    pub fn revoke_all(&mut self) -> usize {
        let count = self.live.len();
        self.live.clear();
        count
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Write a live resource to disk
    pub fn save<P: AsRef<Path>>(&self, handle: &ResourceHandle, path: P) -> Result<()> {
        let resource = self
            .get(handle)
            .ok_or_else(|| AudioError::ResourceRevoked(handle.to_string()))?;

        std::fs::write(path.as_ref(), &resource.bytes)?;
        tracing::info!(
            "Saved {} to {}",
            resource.name,
            path.as_ref().display()
        );
        Ok(())
    }
}
