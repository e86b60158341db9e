use crate::audio::playback::AudioPlaybackControl;
use crate::audio::{shared_detune, PcmBuffer, PitchShift, SharedDetune};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex as TokioMutex};
use tracing::{debug, instrument, trace};

mod command_handler;
mod playback_task;
mod run_loop;
mod state;


// Re-export key types for convenience
pub use state::{InternalPlayerState, InternalPlayerStateUpdate, PlaybackMode, PlayerCommand};

const PLAYER_LOG_TARGET: &str = "keyshift::player";

/// A decoded file the player can start playbacks from.
struct LoadedFile {
    path: PathBuf,
    buffer: Arc<PcmBuffer>,
}

/// Manages the loaded buffer, playback state, and the audio backend.
///
/// All interaction goes through the command channel; the player task owns its
/// state exclusively and broadcasts updates to any listeners.
pub struct Player {
    // --- State ---
    loaded: Option<LoadedFile>,
    pitch: PitchShift,
    detune: SharedDetune,
    is_playing: bool,
    is_loading: bool,
    load_generation: u64,

    // --- Communication ---
    command_rx: mpsc::Receiver<PlayerCommand>,
    state_update_tx: broadcast::Sender<InternalPlayerStateUpdate>,
    // Sender for internal commands (LoadFinished, PlaybackFinished)
    internal_command_tx: mpsc::Sender<PlayerCommand>,

    // --- Audio Backend ---
    // Shared with playback tasks; lives for the player's whole lifetime and
    // is only shut down when the run loop exits.
    audio_backend: Arc<TokioMutex<Box<dyn AudioPlaybackControl>>>,
    // Manages the currently running playback task
    playback_task_manager: Option<playback_task::PlaybackTaskManager>,
}

impl Player {
    /// Creates a new Player instance and the command channel sender.
    /// The Player itself should be run in a separate task using `Player::run`.
    pub fn new(
        audio_backend: Box<dyn AudioPlaybackControl>,
        state_update_capacity: usize, // Capacity for the state broadcast channel
        command_buffer_size: usize,   // Capacity for the command mpsc channel
    ) -> (Self, mpsc::Sender<PlayerCommand>) {
        let (command_tx, command_rx) = mpsc::channel(command_buffer_size);
        let (state_update_tx, _) = broadcast::channel(state_update_capacity);

        let pitch = PitchShift::default();
        let player = Player {
            loaded: None,
            pitch,
            detune: shared_detune(pitch),
            is_playing: false,
            is_loading: false,
            load_generation: 0,
            command_rx,
            state_update_tx,
            internal_command_tx: command_tx.clone(),
            audio_backend: Arc::new(TokioMutex::new(audio_backend)),
            playback_task_manager: None,
        };

        (player, command_tx)
    }

    /// Subscribes to player state updates.
    pub fn subscribe_state_updates(&self) -> broadcast::Receiver<InternalPlayerStateUpdate> {
        self.state_update_tx.subscribe()
    }

    // --- Private Helper Methods ---

    /// Sends a state update via the broadcast channel, logging errors.
    fn broadcast_update(&self, update: InternalPlayerStateUpdate) {
        trace!(target: PLAYER_LOG_TARGET, "Broadcasting state update: {:?}", update);
        if self.state_update_tx.send(update.clone()).is_err() {
            // Only fails when there are no active receivers, which is normal
            // if nothing is listening yet.
            debug!(target: PLAYER_LOG_TARGET, "No active listeners for state update: {:?}", update);
        }
    }

    /// Constructs the full current state object.
    fn get_full_state(&self) -> InternalPlayerState {
        InternalPlayerState {
            mode: if self.is_playing {
                PlaybackMode::Playing
            } else {
                PlaybackMode::Idle
            },
            loaded_file: self.loaded.as_ref().map(|l| l.path.clone()),
            duration_secs: self.loaded.as_ref().map(|l| l.buffer.duration_secs()),
            pitch: self.pitch,
            is_loading: self.is_loading,
        }
    }

    // --- Main Run Loop ---

    /// Runs the player's command processing loop. This should be spawned as a Tokio task.
    #[instrument(skip(self))]
    pub async fn run(&mut self) {
        run_loop::run_player_loop(self).await;
    }
}
