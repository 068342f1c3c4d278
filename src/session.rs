//! One trimming session.
//!
//! [`TrimSession`] holds everything the trimming screen works with: the
//! selected source and its decoded samples, the start/end fields, and the
//! handles for the preview and the exported cut. The shell owns the session
//! and passes it by `&mut` to each action.
//!
//! Decoding is the only asynchronous step. [`TrimSession::select`] hands out
//! a [`DecodeRequest`] tagged with a generation number; when its
//! [`DecodeOutcome`] comes back, [`TrimSession::finish_decode`] drops it if a
//! newer selection has been made in the meantime.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::audio::{decode_audio_async, encode_wav, trim_audio, PcmBuffer, SourceAsset, TrimRange};
use crate::error::{AudioError, Result};
use crate::resource::{mime_for_extension, Resource, ResourceHandle, ResourceStore};
use crate::settings::ExportSettings;

/// A pending decode of a newly selected asset
#[derive(Debug)]
pub struct DecodeRequest {
    generation: u64,
    asset: SourceAsset,
}

impl DecodeRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn asset(&self) -> &SourceAsset {
        &self.asset
    }

    /// Decode on the blocking pool; resolves exactly once
    pub async fn run(self) -> DecodeOutcome {
        let result = decode_audio_async(self.asset.clone()).await;
        DecodeOutcome {
            generation: self.generation,
            asset: self.asset,
            result,
        }
    }
}

/// Result of a [`DecodeRequest`], to be handed back to the session
#[derive(Debug)]
pub struct DecodeOutcome {
    generation: u64,
    asset: SourceAsset,
    result: Result<PcmBuffer>,
}

impl DecodeOutcome {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn asset_name(&self) -> &str {
        &self.asset.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodeStatus {
    /// The asset is now the session's source
    Loaded { duration_seconds: f64 },
    /// A newer selection superseded this decode; its result was dropped
    Stale,
}

/// Which buffer to preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewTarget {
    Original,
    Trimmed,
}

impl FromStr for PreviewTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "original" | "source" => Ok(PreviewTarget::Original),
            "trimmed" | "cut" => Ok(PreviewTarget::Trimmed),
            other => Err(format!(
                "Unknown preview target '{}' (expected original or trimmed)",
                other
            )),
        }
    }
}

#[derive(Debug)]
struct LoadedSource {
    asset: SourceAsset,
    audio: Arc<PcmBuffer>,
    preview: ResourceHandle,
}

#[derive(Debug)]
struct Export {
    handle: ResourceHandle,
    range: TrimRange,
    trimmed: Arc<PcmBuffer>,
}

/// Snapshot of a session for display
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub source: Option<String>,
    pub decoding: bool,
    pub duration_seconds: Option<f64>,
    pub channels: Option<usize>,
    pub sample_rate: Option<u32>,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub preview: Option<String>,
    pub export: Option<String>,
    pub export_range: Option<TrimRange>,
    pub live_resources: usize,
}

#[derive(Debug)]
pub struct TrimSession {
    settings: ExportSettings,
    resources: ResourceStore,
    generation: u64,
    /// Generation of the decode in flight, if any
    pending: Option<u64>,
    loaded: Option<LoadedSource>,
    start_seconds: f64,
    end_seconds: f64,
    export: Option<Export>,
}

impl TrimSession {
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            settings,
            resources: ResourceStore::new(),
            generation: 0,
            pending: None,
            loaded: None,
            start_seconds: 0.0,
            end_seconds: 0.0,
            export: None,
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Begin loading a newly selected asset
    ///
    /// Any decode still in flight becomes stale. The current source, range
    /// and export stay as they are until the new decode succeeds.
    pub fn select(&mut self, asset: SourceAsset) -> DecodeRequest {
        self.generation += 1;
        if let Some(previous) = self.pending.replace(self.generation) {
            tracing::info!("Superseding pending decode #{}", previous);
        }
        tracing::info!("Selected '{}' (decode #{})", asset.name, self.generation);

        DecodeRequest {
            generation: self.generation,
            asset,
        }
    }

    pub fn is_decoding(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply a finished decode
    ///
    /// Stale outcomes are discarded. A failed decode leaves the previous
    /// source (if any) untouched and reports `DecodeFailure`.
    pub fn finish_decode(&mut self, outcome: DecodeOutcome) -> Result<DecodeStatus> {
        if outcome.generation != self.generation {
            tracing::warn!(
                "Discarding stale decode #{} of '{}'",
                outcome.generation,
                outcome.asset.name
            );
            return Ok(DecodeStatus::Stale);
        }

        self.pending = None;

        let audio = match outcome.result {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!("Failed to load '{}': {}", outcome.asset.name, e);
                return Err(e);
            }
        };

        // The new source supersedes the old preview and any export made from it
        if let Some(previous) = self.loaded.take() {
            self.resources.revoke(&previous.preview);
        }
        self.release_export();

        let asset = outcome.asset;
        let preview = self.resources.create(Resource::new(
            asset.name.clone(),
            mime_for_extension(asset.extension()),
            asset.bytes.clone(),
        ));

        let duration_seconds = audio.duration_seconds();
        self.start_seconds = 0.0;
        self.end_seconds = duration_seconds;

        tracing::info!(
            "Loaded '{}': {:.2}s, {} ch @ {} Hz",
            asset.name,
            duration_seconds,
            audio.channel_count(),
            audio.sample_rate()
        );

        self.loaded = Some(LoadedSource {
            asset,
            audio: Arc::new(audio),
            preview,
        });

        Ok(DecodeStatus::Loaded { duration_seconds })
    }

    /// Set the start field (seconds); checked when cutting
    pub fn set_start(&mut self, seconds: f64) {
        self.start_seconds = seconds;
    }

    /// Set the end field (seconds); checked when cutting
    pub fn set_end(&mut self, seconds: f64) {
        self.end_seconds = seconds;
    }

    /// Current (start, end) field values
    pub fn range(&self) -> (f64, f64) {
        (self.start_seconds, self.end_seconds)
    }

    /// Trim the loaded source to the current range and export it as WAV
    ///
    /// On any error the previous export stays available.
    pub fn cut(&mut self) -> Result<ResourceHandle> {
        if self.pending.is_some() {
            return Err(AudioError::NoSourceLoaded);
        }
        let loaded = self.loaded.as_ref().ok_or(AudioError::NoSourceLoaded)?;

        let requested = TrimRange::new(self.start_seconds, self.end_seconds)?;
        let trimmed = trim_audio(&loaded.audio, &requested)?;
        let range = requested
            .to_frames(loaded.audio.sample_rate(), loaded.audio.frame_count())?
            .to_range(loaded.audio.sample_rate());
        let bytes = encode_wav(&trimmed, self.settings.format)?;
        let name = self.settings.export_name(loaded.asset.stem());

        self.release_export();
        let handle = self.resources.create(Resource::wav(name, bytes));

        tracing::info!(
            "Cut {:.3}s..{:.3}s ({} frames) -> {}",
            range.start_seconds,
            range.end_seconds,
            trimmed.frame_count(),
            handle
        );

        self.export = Some(Export {
            handle,
            range,
            trimmed: Arc::new(trimmed),
        });

        Ok(handle)
    }

    /// Seconds the latest cut actually covers, after rounding and clamping
    pub fn export_range(&self) -> Option<TrimRange> {
        self.export.as_ref().map(|export| export.range)
    }

    pub fn export_handle(&self) -> Option<ResourceHandle> {
        self.export.as_ref().map(|export| export.handle)
    }

    pub fn preview_handle(&self) -> Option<ResourceHandle> {
        self.loaded.as_ref().map(|loaded| loaded.preview)
    }

    /// Look up a live resource by handle
    pub fn resource(&self, handle: &ResourceHandle) -> Option<&Resource> {
        self.resources.get(handle)
    }

    /// Save the current export to `path`
    pub fn download<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let export = self.export.as_ref().ok_or(AudioError::NothingToExport)?;
        self.resources.save(&export.handle, path)
    }

    /// Save the current export into `dir` under its suggested name
    pub fn download_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let export = self.export.as_ref().ok_or(AudioError::NothingToExport)?;
        let resource = self
            .resources
            .get(&export.handle)
            .ok_or_else(|| AudioError::ResourceRevoked(export.handle.to_string()))?;

        let path = dir.as_ref().join(&resource.name);
        self.resources.save(&export.handle, &path)?;
        Ok(path)
    }

    /// Buffer to play for a preview; the trimmed cut accompanies the original
    pub fn preview_buffer(&self, target: PreviewTarget) -> Option<Arc<PcmBuffer>> {
        match target {
            PreviewTarget::Original => self.loaded.as_ref().map(|l| Arc::clone(&l.audio)),
            PreviewTarget::Trimmed => self.export.as_ref().map(|e| Arc::clone(&e.trimmed)),
        }
    }

    pub fn status(&self) -> SessionStatus {
        let audio = self.loaded.as_ref().map(|l| &l.audio);

        SessionStatus {
            source: self.loaded.as_ref().map(|l| l.asset.name.clone()),
            decoding: self.is_decoding(),
            duration_seconds: audio.map(|a| a.duration_seconds()),
            channels: audio.map(|a| a.channel_count()),
            sample_rate: audio.map(|a| a.sample_rate()),
            start_seconds: self.start_seconds,
            end_seconds: self.end_seconds,
            preview: self.preview_handle().map(|h| h.to_string()),
            export: self.export_handle().map(|h| h.to_string()),
            export_range: self.export_range(),
            live_resources: self.resources.live_count(),
        }
    }

    /// End the session: release every handle and drop all audio
    pub fn close(&mut self) {
        let released = self.resources.revoke_all();
        if released > 0 {
            tracing::debug!("Session closed, released {} handles", released);
        }
        self.loaded = None;
        self.export = None;
        self.pending = None;
    }

    fn release_export(&mut self) {
        if let Some(previous) = self.export.take() {
            self.resources.revoke(&previous.handle);
        }
    }
}

impl Default for TrimSession {
    fn default() -> Self {
        Self::new(ExportSettings::default())
    }
}

impl Drop for TrimSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{decode_asset, WavFormat};

    /// Stereo ramp WAV of `seconds` at 8 kHz
    fn wav_asset(name: &str, seconds: f64) -> SourceAsset {
        let frames = (seconds * 8000.0) as usize;
        let left: Vec<f32> = (0..frames).map(|i| i as f32 / frames as f32).collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        let audio = PcmBuffer::new(vec![left, right], 8000).unwrap();
        SourceAsset::new(name, crate::audio::encode_wav(&audio, WavFormat::Float32).unwrap())
    }

    fn float_session() -> TrimSession {
        TrimSession::new(ExportSettings::new().with_format(WavFormat::Float32))
    }

    async fn load(session: &mut TrimSession, asset: SourceAsset) -> Result<DecodeStatus> {
        let request = session.select(asset);
        let outcome = request.run().await;
        session.finish_decode(outcome)
    }

    #[test]
    fn test_cut_before_load_is_no_source() {
        let mut session = TrimSession::default();

        assert!(matches!(session.cut(), Err(AudioError::NoSourceLoaded)));
        assert!(matches!(
            session.download("unused.wav"),
            Err(AudioError::NothingToExport)
        ));
        assert_eq!(session.status().live_resources, 0);
    }

    #[tokio::test]
    async fn test_load_resets_range_to_full_duration() {
        let mut session = float_session();
        let status = load(&mut session, wav_asset("ramp.wav", 1.0)).await.unwrap();

        assert_eq!(status, DecodeStatus::Loaded { duration_seconds: 1.0 });
        assert_eq!(session.range(), (0.0, 1.0));
        assert!(!session.is_decoding());

        let preview = session.preview_handle().unwrap();
        assert_eq!(session.resource(&preview).unwrap().mime, "audio/wav");
        assert_eq!(session.status().live_resources, 1);
    }

    #[tokio::test]
    async fn test_cut_exports_trimmed_wav() {
        let mut session = float_session();
        load(&mut session, wav_asset("ramp.wav", 1.0)).await.unwrap();

        session.set_start(0.25);
        session.set_end(0.75);
        let handle = session.cut().unwrap();

        let resource = session.resource(&handle).unwrap().clone();
        assert_eq!(resource.name, "ramp-trimmed.wav");
        assert_eq!(resource.mime, "audio/wav");

        let exported = decode_asset(&SourceAsset::new(resource.name, resource.bytes)).unwrap();
        let trimmed = session.preview_buffer(PreviewTarget::Trimmed).unwrap();
        assert_eq!(exported.frame_count(), 4000);
        assert_eq!(exported.sample_rate(), 8000);
        assert_eq!(&exported, trimmed.as_ref());

        let original = session.preview_buffer(PreviewTarget::Original).unwrap();
        assert_eq!(exported.channel(0).unwrap()[0], original.channel(0).unwrap()[2000]);
    }

    #[tokio::test]
    async fn test_cut_reports_range_clamped_to_source() {
        let mut session = float_session();
        load(&mut session, wav_asset("ramp.wav", 1.0)).await.unwrap();

        session.set_start(0.25);
        session.set_end(100.0);
        session.cut().unwrap();

        // The fields keep what was typed; the export reports what was cut
        assert_eq!(session.range(), (0.25, 100.0));
        assert_eq!(
            session.export_range(),
            Some(TrimRange {
                start_seconds: 0.25,
                end_seconds: 1.0
            })
        );
        assert_eq!(session.status().export_range, session.export_range());
    }

    #[tokio::test]
    async fn test_recut_releases_previous_export() {
        let mut session = float_session();
        load(&mut session, wav_asset("ramp.wav", 1.0)).await.unwrap();

        let first = session.cut().unwrap();
        session.set_end(0.5);
        let second = session.cut().unwrap();

        assert_ne!(first, second);
        assert!(session.resource(&first).is_none());
        assert!(session.resource(&second).is_some());
        // preview + latest export
        assert_eq!(session.status().live_resources, 2);
    }

    #[tokio::test]
    async fn test_invalid_range_keeps_previous_export() {
        let mut session = float_session();
        load(&mut session, wav_asset("ramp.wav", 1.0)).await.unwrap();
        let good = session.cut().unwrap();

        session.set_start(0.9);
        session.set_end(0.1);
        assert!(matches!(session.cut(), Err(AudioError::InvalidRange(_))));

        session.set_start(-1.0);
        assert!(matches!(session.cut(), Err(AudioError::InvalidRange(_))));

        session.set_start(f64::NAN);
        assert!(matches!(session.cut(), Err(AudioError::InvalidRange(_))));

        assert_eq!(session.export_handle(), Some(good));
        assert!(session.resource(&good).is_some());
    }

    #[tokio::test]
    async fn test_empty_range_exports_empty_cut() {
        let mut session = float_session();
        load(&mut session, wav_asset("ramp.wav", 1.0)).await.unwrap();

        session.set_start(0.5);
        session.set_end(0.5);
        session.cut().unwrap();

        let trimmed = session.preview_buffer(PreviewTarget::Trimmed).unwrap();
        assert!(trimmed.is_empty());
        assert_eq!(trimmed.channel_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_decode_is_discarded() {
        let mut session = float_session();

        let first = session.select(wav_asset("first.wav", 1.0));
        let second = session.select(wav_asset("second.wav", 2.0));
        assert!(second.generation() > first.generation());

        // The superseded decode finishes first and must not win
        let stale = first.run().await;
        assert_eq!(session.finish_decode(stale).unwrap(), DecodeStatus::Stale);
        assert!(session.is_decoding());
        assert!(session.status().source.is_none());
        assert!(matches!(session.cut(), Err(AudioError::NoSourceLoaded)));

        let current = second.run().await;
        assert_eq!(
            session.finish_decode(current).unwrap(),
            DecodeStatus::Loaded { duration_seconds: 2.0 }
        );
        assert_eq!(session.status().source.as_deref(), Some("second.wav"));
    }

    #[tokio::test]
    async fn test_stale_decode_after_newer_load_is_discarded() {
        let mut session = float_session();

        let first = session.select(wav_asset("first.wav", 1.0));
        let second = session.select(wav_asset("second.wav", 2.0));

        let current = second.run().await;
        session.finish_decode(current).unwrap();

        let late = first.run().await;
        assert_eq!(session.finish_decode(late).unwrap(), DecodeStatus::Stale);
        assert_eq!(session.status().source.as_deref(), Some("second.wav"));
    }

    #[tokio::test]
    async fn test_decode_failure_keeps_prior_state() {
        let mut session = float_session();
        load(&mut session, wav_asset("good.wav", 1.0)).await.unwrap();
        let export = session.cut().unwrap();

        let result = load(&mut session, SourceAsset::new("bad.mp3", vec![0u8; 64])).await;
        assert!(matches!(result, Err(AudioError::DecodeFailure(_))));

        let status = session.status();
        assert_eq!(status.source.as_deref(), Some("good.wav"));
        assert!(!status.decoding);
        assert_eq!(session.export_handle(), Some(export));

        // Still usable without starting over
        session.set_start(0.1);
        assert!(session.cut().is_ok());
    }

    #[tokio::test]
    async fn test_new_file_releases_previous_handles() {
        let mut session = float_session();
        load(&mut session, wav_asset("a.wav", 1.0)).await.unwrap();
        let old_preview = session.preview_handle().unwrap();
        let old_export = session.cut().unwrap();

        load(&mut session, wav_asset("b.wav", 0.5)).await.unwrap();

        assert!(session.resource(&old_preview).is_none());
        assert!(session.resource(&old_export).is_none());
        assert!(session.export_handle().is_none());
        assert!(session.preview_buffer(PreviewTarget::Trimmed).is_none());
        assert_eq!(session.status().live_resources, 1);
        assert_eq!(session.range(), (0.0, 0.5));
    }

    #[tokio::test]
    async fn test_download_writes_export() {
        let mut session = float_session();
        load(&mut session, wav_asset("ramp.wav", 1.0)).await.unwrap();
        let handle = session.cut().unwrap();

        let dir = std::env::temp_dir();
        let path = session.download_to_dir(&dir).unwrap();
        assert_eq!(path, dir.join("ramp-trimmed.wav"));

        let written = std::fs::read(&path).unwrap();
        assert_eq!(&written[..], &*session.resource(&handle).unwrap().bytes);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_close_releases_everything() {
        let mut session = float_session();
        load(&mut session, wav_asset("ramp.wav", 1.0)).await.unwrap();
        session.cut().unwrap();
        assert_eq!(session.status().live_resources, 2);

        session.close();

        let status = session.status();
        assert_eq!(status.live_resources, 0);
        assert!(status.source.is_none());
        assert!(status.export.is_none());
    }

    #[test]
    fn test_preview_target_parsing() {
        assert_eq!("original".parse::<PreviewTarget>().unwrap(), PreviewTarget::Original);
        assert_eq!("trimmed".parse::<PreviewTarget>().unwrap(), PreviewTarget::Trimmed);
        assert!("both".parse::<PreviewTarget>().is_err());
    }
}
