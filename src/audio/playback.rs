// src/audio/playback.rs
use crate::audio::alsa_handler::AlsaPcmHandler;
use crate::audio::decoder::PcmBuffer;
use crate::audio::error::AudioError;
use crate::audio::pitch::{cents_to_rate, SharedDetune};
use crate::audio::sample_converter;
use async_trait::async_trait;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task;
use tracing::{debug, error, info, instrument, trace, warn};

const LOG_TARGET: &str = "keyshift::audio::playback";

/// Frames fed to the resampler per iteration.
const RESAMPLER_CHUNK_FRAMES: usize = 1024;

/// Frames handed to a single blocking ALSA write.
const ALSA_WRITE_CHUNK_FRAMES: usize = 4096;

/// Detune can swing a full octave either way; the resampler must accept the
/// whole ratio range relative to its construction ratio.
const MAX_RESAMPLE_RATIO_RELATIVE: f64 = 8.0;

/// Callback type for when playback finishes naturally.
pub type OnFinishCallback = Box<dyn FnOnce() + Send + Sync + 'static>;

/// Trait defining the controls for an audio playback backend.
///
/// One call to `play` is one non-restartable playback handle: it runs the
/// whole buffer to completion (firing `on_finish` exactly once) unless the
/// shutdown signal halts it first.
#[async_trait]
pub trait AudioPlaybackControl: Send + Sync {
    /// Plays the decoded buffer from the beginning.
    ///
    /// `detune` is re-read throughout playback, so changes become audible
    /// without interrupting the stream. `on_finish` fires only on natural
    /// end of the buffer, never on shutdown.
    async fn play(
        &mut self,
        buffer: Arc<PcmBuffer>,
        detune: SharedDetune,
        on_finish: OnFinishCallback,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), AudioError>;

    /// Performs a full shutdown of the audio backend (e.g., closing the ALSA
    /// device). Should be called before dropping the implementing struct.
    async fn shutdown(&mut self) -> Result<(), AudioError>;
}

/// Indicates the reason why the playback loop terminated successfully.
#[derive(Debug, PartialEq, Eq)]
enum PlaybackLoopExitReason {
    EndOfStream,
    ShutdownSignal,
}

/// ALSA-backed playback engine.
///
/// Owns the output device for the player's whole lifetime; each `play` call
/// re-initializes the PCM for the buffer's rate and channel count.
pub struct PlaybackEngine {
    alsa_handler: Arc<Mutex<AlsaPcmHandler>>,
}

impl PlaybackEngine {
    /// Creates a new playback engine for the specified ALSA device.
    pub fn new(device_name: &str) -> Self {
        info!(target: LOG_TARGET, "Creating PlaybackEngine for device: {}", device_name);
        PlaybackEngine {
            alsa_handler: Arc::new(Mutex::new(AlsaPcmHandler::new(device_name))),
        }
    }

    /// Writes the S16LE buffer to ALSA in chunks, handling blocking writes
    /// and shutdown signals.
    async fn write_to_alsa(
        &self,
        s16_buffer: &[i16],
        num_channels: usize,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<(), AudioError> {
        if s16_buffer.is_empty() || num_channels == 0 {
            return Ok(());
        }

        let total_frames = s16_buffer.len() / num_channels;
        let mut offset = 0;

        while offset < total_frames {
            // Check shutdown before potentially blocking
            if shutdown_rx.try_recv().is_ok() {
                info!(target: LOG_TARGET, "Shutdown signal received during ALSA write loop.");
                return Err(AudioError::ShutdownRequested);
            }

            let chunk_frames = (total_frames - offset).min(ALSA_WRITE_CHUNK_FRAMES);
            let chunk =
                s16_buffer[offset * num_channels..(offset + chunk_frames) * num_channels].to_vec();

            let handler = Arc::clone(&self.alsa_handler);
            let write_result = task::spawn_blocking(move || match handler.lock() {
                Ok(guard) => guard.write_s16_buffer(&chunk),
                Err(poisoned) => {
                    error!(target: LOG_TARGET, "ALSA handler mutex poisoned: {}", poisoned);
                    Err(AudioError::InvalidState(
                        "ALSA handler mutex poisoned".to_string(),
                    ))
                }
            })
            .await?;

            match write_result {
                Ok(0) => {
                    // Recovered underrun; retry the same chunk after a short pause.
                    warn!(target: LOG_TARGET, "ALSA underrun recovered, retrying chunk.");
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                }
                Ok(frames_written) => {
                    offset += frames_written.min(chunk_frames);
                    trace!(
                        target: LOG_TARGET,
                        "Wrote {} frames to ALSA ({}/{})",
                        frames_written, offset, total_frames
                    );
                }
                Err(e) => {
                    error!(target: LOG_TARGET, "ALSA write failed: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Walks the PCM buffer, resampling each chunk at the ratio implied by
    /// the current detune, and feeds the converted output to ALSA.
    async fn playback_loop(
        &self,
        buffer: &PcmBuffer,
        detune: &SharedDetune,
        device_rate: u32,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<PlaybackLoopExitReason, AudioError> {
        let num_channels = buffer.channels();
        let total_frames = buffer.frames();
        let base_ratio = device_rate as f64 / buffer.sample_rate() as f64;

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let mut applied_cents = detune.load(Ordering::Relaxed);
        let mut resampler = SincFixedIn::<f32>::new(
            base_ratio / cents_to_rate(applied_cents),
            MAX_RESAMPLE_RATIO_RELATIVE,
            params,
            RESAMPLER_CHUNK_FRAMES,
            num_channels,
        )
        .map_err(|e| {
            AudioError::InitializationError(format!("Failed to create resampler: {}", e))
        })?;

        info!(
            target: LOG_TARGET,
            "Starting playback loop: {} frames @ {} Hz -> {} Hz, detune {} cents",
            total_frames,
            buffer.sample_rate(),
            device_rate,
            applied_cents
        );

        let mut position = 0;
        while position < total_frames {
            if shutdown_rx.try_recv().is_ok() {
                info!(target: LOG_TARGET, "Shutdown signal received in playback loop.");
                return Ok(PlaybackLoopExitReason::ShutdownSignal);
            }

            // Live detune update: pick up the latest value before each chunk.
            let cents = detune.load(Ordering::Relaxed);
            if cents != applied_cents {
                debug!(target: LOG_TARGET, "Detune changed: {} -> {} cents", applied_cents, cents);
                resampler
                    .set_resample_ratio(base_ratio / cents_to_rate(cents), true)
                    .map_err(|e| {
                        AudioError::ResamplingError(format!("Failed to update ratio: {}", e))
                    })?;
                applied_cents = cents;
            }

            let needed = resampler.input_frames_next();
            let end = (position + needed).min(total_frames);
            let chunk: Vec<&[f32]> = buffer
                .planes()
                .iter()
                .map(|plane| &plane[position..end])
                .collect();

            let output = if end - position == needed {
                resampler.process(&chunk, None)
            } else {
                // Final partial chunk of the buffer.
                resampler.process_partial(Some(chunk.as_slice()), None)
            }
            .map_err(|e| AudioError::ResamplingError(e.to_string()))?;
            position = end;

            let s16_vec = sample_converter::interleave_f32_to_s16(&output);
            if s16_vec.is_empty() {
                continue;
            }

            match self.write_to_alsa(&s16_vec, num_channels, &mut shutdown_rx).await {
                Ok(()) => {}
                Err(AudioError::ShutdownRequested) => {
                    return Ok(PlaybackLoopExitReason::ShutdownSignal);
                }
                Err(e) => return Err(e),
            }
        }

        // Flush whatever the resampler still holds.
        let flushed = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| AudioError::ResamplingError(format!("Resampler flush failed: {}", e)))?;
        let s16_vec = sample_converter::interleave_f32_to_s16(&flushed);
        if !s16_vec.is_empty() {
            match self.write_to_alsa(&s16_vec, num_channels, &mut shutdown_rx).await {
                Ok(()) => {}
                Err(AudioError::ShutdownRequested) => {
                    return Ok(PlaybackLoopExitReason::ShutdownSignal);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(PlaybackLoopExitReason::EndOfStream)
    }
}

#[async_trait]
impl AudioPlaybackControl for PlaybackEngine {
    #[instrument(skip(self, buffer, detune, on_finish, shutdown_rx), fields(frames = buffer.frames()))]
    async fn play(
        &mut self,
        buffer: Arc<PcmBuffer>,
        detune: SharedDetune,
        on_finish: OnFinishCallback,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), AudioError> {
        // --- ALSA Initialization & Actual Rate ---
        let device_rate = {
            let mut guard = self.alsa_handler.lock().map_err(|e| {
                AudioError::InvalidState(format!("ALSA handler mutex poisoned on init: {}", e))
            })?;
            guard.initialize(buffer.sample_rate(), buffer.channels())?;
            guard.actual_rate().ok_or_else(|| {
                AudioError::InitializationError(
                    "ALSA handler did not report an actual rate".to_string(),
                )
            })?
        };

        let loop_result = self
            .playback_loop(&buffer, &detune, device_rate, shutdown_rx)
            .await;

        match loop_result {
            Ok(PlaybackLoopExitReason::EndOfStream) => {
                info!(target: LOG_TARGET, "Playback finished (end of buffer). Draining ALSA.");
                if let Ok(guard) = self.alsa_handler.lock() {
                    if let Err(e) = guard.drain() {
                        warn!(target: LOG_TARGET, "Error draining ALSA after end of stream: {}", e);
                    }
                }
                on_finish();
                Ok(())
            }
            Ok(PlaybackLoopExitReason::ShutdownSignal) => {
                // Stop must silence output immediately, so throw away
                // whatever ALSA still has buffered instead of letting it
                // play out.
                info!(target: LOG_TARGET, "Playback halted by shutdown signal. Discarding buffered audio.");
                if let Ok(guard) = self.alsa_handler.lock() {
                    if let Err(e) = guard.discard() {
                        warn!(target: LOG_TARGET, "Error discarding ALSA buffer after stop: {}", e);
                    }
                }
                Ok(())
            }
            Err(e) => {
                error!(target: LOG_TARGET, "Playback loop failed: {}", e);
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    async fn shutdown(&mut self) -> Result<(), AudioError> {
        info!(target: LOG_TARGET, "Shutting down PlaybackEngine.");
        let handler = Arc::clone(&self.alsa_handler);
        task::spawn_blocking(move || match handler.lock() {
            Ok(mut guard) => {
                guard.close();
                Ok(())
            }
            Err(poisoned) => {
                error!(target: LOG_TARGET, "ALSA handler mutex poisoned during shutdown: {}", poisoned);
                Err(AudioError::InvalidState(
                    "ALSA handler mutex poisoned during shutdown".to_string(),
                ))
            }
        })
        .await?
    }
}
