use crate::audio::{AudioError, PcmBuffer, PitchShift};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Commands that can be sent to the Player task.
#[derive(Debug)]
pub enum PlayerCommand {
    LoadFile {
        path: PathBuf,
    },
    Play,
    Stop,
    SetPitch {
        pitch: PitchShift,
    },
    GetFullState(oneshot::Sender<InternalPlayerState>),
    /// Internal: a background decode finished. The generation lets the player
    /// discard results from loads that were superseded by a newer LoadFile.
    LoadFinished {
        generation: u64,
        path: PathBuf,
        result: Result<Arc<PcmBuffer>, AudioError>,
    },
    /// Internal: the active playback reached the end of the buffer.
    PlaybackFinished,
    Shutdown,
}

/// The playback mode of the player. Stopping and finishing both land in Idle;
/// there is no pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Idle,
    Playing,
}

/// Represents the detailed internal state of the player.
#[derive(Debug, Clone)]
pub struct InternalPlayerState {
    pub mode: PlaybackMode,
    pub loaded_file: Option<PathBuf>,
    pub duration_secs: Option<f64>,
    pub pitch: PitchShift,
    pub is_loading: bool,
}

/// Updates broadcast by the Player task about its state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum InternalPlayerStateUpdate {
    Loading {
        path: PathBuf,
    },
    FileLoaded {
        path: PathBuf,
        duration_secs: f64,
    },
    Playing {
        path: PathBuf,
        pitch: PitchShift,
    },
    Stopped,
    PitchChanged {
        pitch: PitchShift,
    },
    Error(String),
}
