// src/player/playback_task.rs

use crate::audio::playback::AudioPlaybackControl;
use crate::audio::{PcmBuffer, SharedDetune};
use crate::player::{PlayerCommand, PLAYER_LOG_TARGET};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::{broadcast, mpsc, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace};

/// Manages a single audio playback task.
///
/// A task plays one buffer from start to end and cannot be restarted; stopping
/// consumes the manager.
#[derive(Debug)]
pub struct PlaybackTaskManager {
    task_handle: JoinHandle<()>,
    shutdown_tx: broadcast::Sender<()>,
    path: PathBuf,
}

impl PlaybackTaskManager {
    /// Sends the shutdown signal to the managed task.
    fn signal_shutdown(&mut self) {
        debug!(target: PLAYER_LOG_TARGET, path = %self.path.display(), "Sending shutdown signal to playback task.");
        if let Err(e) = self.shutdown_tx.send(()) {
            // Expected when the task already finished naturally.
            trace!(target: PLAYER_LOG_TARGET, path = %self.path.display(), "Failed to send shutdown signal (receiver likely dropped): {}", e);
        }
    }

    /// Waits for the managed task to complete, aborting it after a timeout.
    /// Consumes the manager instance.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn await_completion(mut self) {
        debug!(target: PLAYER_LOG_TARGET, "Waiting for playback task to finish...");
        let timeout_duration = StdDuration::from_secs(5);

        tokio::select! {
            biased;
            result = &mut self.task_handle => {
                match result {
                    Ok(()) => {
                        info!(target: PLAYER_LOG_TARGET, path = %self.path.display(), "Playback task finished gracefully.");
                    }
                    Err(e) if e.is_panic() => {
                        error!(target: PLAYER_LOG_TARGET, path = %self.path.display(), "Playback task panicked: {:?}", e);
                    }
                    Err(e) => {
                        error!(target: PLAYER_LOG_TARGET, path = %self.path.display(), "Playback task join error: {:?}", e);
                    }
                }
            }
            _ = tokio::time::sleep(timeout_duration) => {
                error!(target: PLAYER_LOG_TARGET, path = %self.path.display(), "Timeout waiting for playback task after {:?}. Aborting.", timeout_duration);
                self.task_handle.abort();
            }
        }
    }

    /// Stops the managed task by sending a shutdown signal and awaiting
    /// completion. Consumes the manager instance.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn stop_task(mut self) {
        info!(target: PLAYER_LOG_TARGET, "Stopping playback task...");
        self.signal_shutdown();
        self.await_completion().await;
    }

    /// Returns a mutable reference to the JoinHandle for polling in select!
    pub fn handle(&mut self) -> &mut JoinHandle<()> {
        &mut self.task_handle
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

/// Spawns a new Tokio task that plays the buffer on the shared audio backend.
///
/// When the buffer runs out naturally, the task sends `PlaybackFinished` back
/// to the player; a shutdown signal skips that notification.
#[instrument(skip(shared_backend, buffer, detune, internal_cmd_tx), fields(path = %path.display()))]
pub fn spawn_playback_task(
    shared_backend: Arc<TokioMutex<Box<dyn AudioPlaybackControl>>>,
    buffer: Arc<PcmBuffer>,
    detune: SharedDetune,
    path: PathBuf,
    internal_cmd_tx: mpsc::Sender<PlayerCommand>,
) -> PlaybackTaskManager {
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let path_for_struct = path.clone();

    info!(target: PLAYER_LOG_TARGET, "Spawning playback task for {}", path.display());
    let task_handle = tokio::spawn(async move {
        debug!(target: PLAYER_LOG_TARGET, path = %path.display(), "[Playback Task] Started.");

        let finish_callback = {
            let cmd_tx = internal_cmd_tx.clone();
            let path = path.clone();
            Box::new(move || {
                info!(target: PLAYER_LOG_TARGET, path = %path.display(), "[Playback Task] Reached end of buffer. Sending PlaybackFinished command.");
                if let Err(e) = cmd_tx.try_send(PlayerCommand::PlaybackFinished) {
                    error!(target: PLAYER_LOG_TARGET, path = %path.display(), "[Playback Task] Failed to send PlaybackFinished command: {}", e);
                }
            })
        };

        let play_result = {
            let mut backend_guard = shared_backend.lock().await;
            backend_guard
                .play(buffer, detune, finish_callback, shutdown_rx)
                .await
        };

        match play_result {
            Ok(()) => debug!(target: PLAYER_LOG_TARGET, path = %path.display(), "[Playback Task] Playback completed."),
            Err(e) => error!(target: PLAYER_LOG_TARGET, path = %path.display(), "[Playback Task] Playback failed: {}", e),
        }
        debug!(target: PLAYER_LOG_TARGET, path = %path.display(), "[Playback Task] Finished.");
    });

    PlaybackTaskManager {
        task_handle,
        shutdown_tx,
        path: path_for_struct,
    }
}
