// src/audio/playback.rs
//! Preview playback of decoded buffers using cpal
//!
//! Plays a [`PcmBuffer`] already in memory (the loaded source or the latest
//! cut) on the default output device. The cpal stream lives entirely in a
//! background thread, so the player itself is Send + Sync.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::types::PcmBuffer;
use crate::error::{AudioError, Result};

/// Shared state for audio playback - all atomic for thread safety
struct SharedPlaybackState {
    is_playing: AtomicBool,
    current_frame: AtomicU64,
    total_frames: AtomicU64,
    sample_rate: AtomicU64,
    should_stop: AtomicBool,
    seek_to_frame: AtomicU64,
    seek_pending: AtomicBool,
}

impl SharedPlaybackState {
    fn new() -> Self {
        Self {
            is_playing: AtomicBool::new(false),
            current_frame: AtomicU64::new(0),
            total_frames: AtomicU64::new(0),
            sample_rate: AtomicU64::new(44100),
            should_stop: AtomicBool::new(false),
            seek_to_frame: AtomicU64::new(0),
            seek_pending: AtomicBool::new(false),
        }
    }
}

/// Audio player that manages playback in a background thread
pub struct AudioPlayer {
    state: Arc<SharedPlaybackState>,
    playback_thread: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for AudioPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (is_playing, current_time, duration) = self.get_state();
        f.debug_struct("AudioPlayer")
            .field("is_playing", &is_playing)
            .field("current_time", &current_time)
            .field("duration", &duration)
            .finish()
    }
}

impl Default for AudioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlayer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SharedPlaybackState::new()),
            playback_thread: Mutex::new(None),
        }
    }

    /// Start playing a buffer from the beginning, replacing any current preview
    ///
    /// Returns once the output stream is running, or with the error that
    /// kept it from starting.
    pub fn play(&mut self, audio: Arc<PcmBuffer>) -> Result<()> {
        if audio.is_empty() {
            return Err(AudioError::Playback("Nothing to play: buffer is empty".to_string()));
        }

        // Stop any existing playback
        self.stop();

        let state = Arc::clone(&self.state);

        // Reset state
        state.should_stop.store(false, Ordering::SeqCst);
        state.current_frame.store(0, Ordering::SeqCst);
        state.seek_pending.store(false, Ordering::SeqCst);
        state
            .total_frames
            .store(audio.frame_count() as u64, Ordering::SeqCst);
        state
            .sample_rate
            .store(audio.sample_rate() as u64, Ordering::SeqCst);
        state.is_playing.store(true, Ordering::SeqCst);

        let (started_tx, started_rx) = mpsc::channel();
        let handle = thread::spawn(move || run_playback(audio, state, started_tx));
        *self.thread_slot() = Some(handle);

        let started = self.await_stream_start(&started_rx);
        if started.is_err() {
            if let Some(handle) = self.thread_slot().take() {
                let _ = handle.join();
            }
        }
        started
    }

    fn await_stream_start(&self, started: &mpsc::Receiver<Result<()>>) -> Result<()> {
        let result = match started.recv() {
            Ok(result) => result,
            Err(_) => Err(AudioError::Playback(
                "Playback thread exited before the stream started".to_string(),
            )),
        };

        if let Err(e) = &result {
            self.state.is_playing.store(false, Ordering::SeqCst);
            tracing::error!("Playback error: {}", e);
        }
        result
    }

    /// Pause playback
    pub fn pause(&self) {
        self.state.is_playing.store(false, Ordering::SeqCst);
    }

    /// Resume playback
    pub fn resume(&self) {
        self.state.is_playing.store(true, Ordering::SeqCst);
    }

    /// Seek to a specific time in seconds; negative times seek to the start
    pub fn seek(&self, time_seconds: f64) {
        let rate = self.state.sample_rate.load(Ordering::SeqCst);
        let frame = (time_seconds.max(0.0) * rate as f64) as u64;
        self.state.seek_to_frame.store(frame, Ordering::SeqCst);
        self.state.seek_pending.store(true, Ordering::SeqCst);
    }

    /// Stop playback completely
    pub fn stop(&mut self) {
        self.state.should_stop.store(true, Ordering::SeqCst);
        self.state.is_playing.store(false, Ordering::SeqCst);

        // Wait for playback thread to finish
        if let Some(handle) = self.thread_slot().take() {
            let _ = handle.join();
        }

        self.state.current_frame.store(0, Ordering::SeqCst);
    }

    /// (is_playing, current_time, duration) in seconds
    pub fn get_state(&self) -> (bool, f64, f64) {
        let is_playing = self.state.is_playing.load(Ordering::SeqCst);
        let frame = self.state.current_frame.load(Ordering::SeqCst);
        let total = self.state.total_frames.load(Ordering::SeqCst);
        let rate = self.state.sample_rate.load(Ordering::SeqCst);

        if rate == 0 {
            return (is_playing, 0.0, 0.0);
        }

        (is_playing, frame as f64 / rate as f64, total as f64 / rate as f64)
    }

    fn thread_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.playback_thread
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run the output stream in a dedicated thread until stopped or finished
///
/// Reports on `started` whether the stream came up before entering the loop.
fn run_playback(
    audio: Arc<PcmBuffer>,
    state: Arc<SharedPlaybackState>,
    started: mpsc::Sender<Result<()>>,
) {
    let channels = audio.channel_count();
    let samples: Arc<Vec<f32>> = Arc::new(audio.interleaved().collect());
    let read_pos = Arc::new(AtomicU64::new(0));

    let stream = match start_stream(&audio, &samples, &state, &read_pos) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = started.send(Err(e));
            return;
        }
    };
    let _ = started.send(Ok(()));

    // Main loop - handle seek and wait for completion
    loop {
        if state.should_stop.load(Ordering::SeqCst) {
            break;
        }

        if state.seek_pending.load(Ordering::SeqCst) {
            let seek_frame = state.seek_to_frame.load(Ordering::SeqCst);
            let seek_sample = (seek_frame as usize * channels).min(samples.len());
            read_pos.store(seek_sample as u64, Ordering::SeqCst);
            state
                .current_frame
                .store((seek_sample / channels) as u64, Ordering::SeqCst);
            state.seek_pending.store(false, Ordering::SeqCst);
        }

        // Check if playback finished
        if read_pos.load(Ordering::SeqCst) as usize >= samples.len() {
            state.is_playing.store(false, Ordering::SeqCst);
            state.current_frame.store(0, Ordering::SeqCst);
            break;
        }

        thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
}

/// Open the default output device and start a stream reading from `samples`
fn start_stream(
    audio: &PcmBuffer,
    samples: &Arc<Vec<f32>>,
    state: &Arc<SharedPlaybackState>,
    read_pos: &Arc<AtomicU64>,
) -> Result<cpal::Stream> {
    let channels = audio.channel_count();

    // Set up cpal audio output
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::Playback("No output device available".to_string()))?;

    let config = StreamConfig {
        channels: channels as u16,
        sample_rate: cpal::SampleRate(audio.sample_rate()),
        buffer_size: cpal::BufferSize::Default,
    };

    let samples_clone = Arc::clone(samples);
    let state_clone = Arc::clone(state);
    let read_pos_clone = Arc::clone(read_pos);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !state_clone.is_playing.load(Ordering::SeqCst) {
                    // Output silence when paused
                    data.fill(0.0);
                    return;
                }

                let pos = read_pos_clone.load(Ordering::SeqCst) as usize;
                for (i, sample) in data.iter_mut().enumerate() {
                    *sample = samples_clone.get(pos + i).copied().unwrap_or(0.0);
                }

                let new_pos = (pos + data.len()).min(samples_clone.len());
                read_pos_clone.store(new_pos as u64, Ordering::SeqCst);
                state_clone
                    .current_frame
                    .store((new_pos / channels) as u64, Ordering::SeqCst);
            },
            |err| {
                tracing::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::Playback(format!("Failed to build stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| AudioError::Playback(format!("Failed to start stream: {}", e)))?;

    Ok(stream)
}
