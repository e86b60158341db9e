//! End-to-end player scenarios against a recording audio backend.

use crate::test_utils;
use keyshift::audio::{
    AudioError, AudioPlaybackControl, OnFinishCallback, PcmBuffer, PitchShift, SharedDetune,
};
use keyshift::player::{
    InternalPlayerState, InternalPlayerStateUpdate, PlaybackMode, Player, PlayerCommand,
};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

/// How the backend should behave when asked to play.
#[derive(Clone, Copy)]
enum Behavior {
    /// Fire on_finish right away, like a zero-length clip.
    FinishImmediately,
    /// Block until the shutdown signal, like an endless clip.
    HoldUntilShutdown,
}

/// Backend that records what the player asked it to do.
struct RecordingBackend {
    behavior: Behavior,
    /// Detune (cents) observed at the start of each play call.
    start_detunes: Arc<StdMutex<Vec<i32>>>,
    /// Detune handle of the most recent play call.
    live_detune: Arc<StdMutex<Option<SharedDetune>>>,
}

impl RecordingBackend {
    fn new(behavior: Behavior) -> Self {
        RecordingBackend {
            behavior,
            start_detunes: Arc::new(StdMutex::new(Vec::new())),
            live_detune: Arc::new(StdMutex::new(None)),
        }
    }
}

#[async_trait::async_trait]
impl AudioPlaybackControl for RecordingBackend {
    async fn play(
        &mut self,
        _buffer: Arc<PcmBuffer>,
        detune: SharedDetune,
        on_finish: OnFinishCallback,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), AudioError> {
        self.start_detunes
            .lock()
            .unwrap()
            .push(detune.load(Ordering::Relaxed));
        *self.live_detune.lock().unwrap() = Some(Arc::clone(&detune));

        match self.behavior {
            Behavior::FinishImmediately => {
                on_finish();
                Ok(())
            }
            Behavior::HoldUntilShutdown => {
                let _ = shutdown_rx.recv().await;
                Ok(())
            }
        }
    }

    async fn shutdown(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

async fn get_state(command_tx: &mpsc::Sender<PlayerCommand>) -> InternalPlayerState {
    let (tx, rx) = oneshot::channel();
    command_tx
        .send(PlayerCommand::GetFullState(tx))
        .await
        .unwrap();
    rx.await.unwrap()
}

async fn next_matching<F>(
    rx: &mut broadcast::Receiver<InternalPlayerStateUpdate>,
    mut predicate: F,
) -> InternalPlayerStateUpdate
where
    F: FnMut(&InternalPlayerStateUpdate) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let update = rx.recv().await.unwrap();
            if predicate(&update) {
                return update;
            }
        }
    })
    .await
    .expect("Timed out waiting for state update")
}

/// The full user journey: load a file, play it, shift pitch mid-playback,
/// stop, then play again and let it run out.
#[tokio::test]
async fn load_play_shift_stop_replay() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_utils::write_wav(&dir, "song.wav", 44100, 2, 4410);

    let backend = RecordingBackend::new(Behavior::HoldUntilShutdown);
    let start_detunes = Arc::clone(&backend.start_detunes);
    let live_detune = Arc::clone(&backend.live_detune);

    let (mut player, command_tx) = Player::new(Box::new(backend), 32, 32);
    let mut updates = player.subscribe_state_updates();
    tokio::spawn(async move { player.run().await });

    // Load
    command_tx
        .send(PlayerCommand::LoadFile { path: path.clone() })
        .await
        .unwrap();
    next_matching(&mut updates, |u| {
        matches!(u, InternalPlayerStateUpdate::FileLoaded { .. })
    })
    .await;

    // Play at default pitch
    command_tx.send(PlayerCommand::Play).await.unwrap();
    next_matching(&mut updates, |u| {
        matches!(u, InternalPlayerStateUpdate::Playing { .. })
    })
    .await;
    assert_eq!(get_state(&command_tx).await.mode, PlaybackMode::Playing);

    // Shift pitch while playing; the running backend must see the new value
    // through the shared atomic without being restarted.
    command_tx
        .send(PlayerCommand::SetPitch {
            pitch: PitchShift::new(4).unwrap(),
        })
        .await
        .unwrap();
    next_matching(&mut updates, |u| {
        matches!(u, InternalPlayerStateUpdate::PitchChanged { .. })
    })
    .await;
    let detune = live_detune.lock().unwrap().clone().unwrap();
    assert_eq!(detune.load(Ordering::Relaxed), 400);
    assert_eq!(start_detunes.lock().unwrap().len(), 1, "pitch change must not restart playback");

    // Stop
    command_tx.send(PlayerCommand::Stop).await.unwrap();
    next_matching(&mut updates, |u| *u == InternalPlayerStateUpdate::Stopped).await;
    assert_eq!(get_state(&command_tx).await.mode, PlaybackMode::Idle);

    // Play again: starts from the beginning at the current pitch
    command_tx.send(PlayerCommand::Play).await.unwrap();
    next_matching(&mut updates, |u| {
        matches!(u, InternalPlayerStateUpdate::Playing { .. })
    })
    .await;
    assert_eq!(start_detunes.lock().unwrap().as_slice(), &[0, 400]);

    command_tx.send(PlayerCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn natural_end_returns_player_to_idle() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_utils::write_wav(&dir, "short.wav", 44100, 1, 441);

    let backend = RecordingBackend::new(Behavior::FinishImmediately);
    let (mut player, command_tx) = Player::new(Box::new(backend), 32, 32);
    let mut updates = player.subscribe_state_updates();
    tokio::spawn(async move { player.run().await });

    command_tx.send(PlayerCommand::LoadFile { path }).await.unwrap();
    next_matching(&mut updates, |u| {
        matches!(u, InternalPlayerStateUpdate::FileLoaded { .. })
    })
    .await;

    command_tx.send(PlayerCommand::Play).await.unwrap();
    next_matching(&mut updates, |u| *u == InternalPlayerStateUpdate::Stopped).await;

    let state = get_state(&command_tx).await;
    assert_eq!(state.mode, PlaybackMode::Idle);
    // The loaded file survives playback ending.
    assert!(state.loaded_file.is_some());

    command_tx.send(PlayerCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn loading_new_file_does_not_interrupt_playback() {
    let dir = tempfile::tempdir().unwrap();
    let first = test_utils::write_wav(&dir, "first.wav", 44100, 1, 441);
    let second = test_utils::write_wav(&dir, "second.wav", 48000, 2, 480);

    let backend = RecordingBackend::new(Behavior::HoldUntilShutdown);
    let (mut player, command_tx) = Player::new(Box::new(backend), 32, 32);
    let mut updates = player.subscribe_state_updates();
    tokio::spawn(async move { player.run().await });

    command_tx
        .send(PlayerCommand::LoadFile { path: first })
        .await
        .unwrap();
    next_matching(&mut updates, |u| {
        matches!(u, InternalPlayerStateUpdate::FileLoaded { .. })
    })
    .await;
    command_tx.send(PlayerCommand::Play).await.unwrap();
    next_matching(&mut updates, |u| {
        matches!(u, InternalPlayerStateUpdate::Playing { .. })
    })
    .await;

    // Load a second file while the first is still playing.
    command_tx
        .send(PlayerCommand::LoadFile {
            path: second.clone(),
        })
        .await
        .unwrap();
    next_matching(&mut updates, |u| {
        matches!(u, InternalPlayerStateUpdate::FileLoaded { .. })
    })
    .await;

    let state = get_state(&command_tx).await;
    assert_eq!(state.mode, PlaybackMode::Playing);
    assert_eq!(state.loaded_file.as_deref(), Some(second.as_path()));

    command_tx.send(PlayerCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn failed_load_keeps_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    let good = test_utils::write_wav(&dir, "good.wav", 44100, 1, 441);

    let backend = RecordingBackend::new(Behavior::FinishImmediately);
    let (mut player, command_tx) = Player::new(Box::new(backend), 32, 32);
    let mut updates = player.subscribe_state_updates();
    tokio::spawn(async move { player.run().await });

    command_tx
        .send(PlayerCommand::LoadFile { path: good.clone() })
        .await
        .unwrap();
    next_matching(&mut updates, |u| {
        matches!(u, InternalPlayerStateUpdate::FileLoaded { .. })
    })
    .await;

    command_tx
        .send(PlayerCommand::LoadFile {
            path: dir.path().join("missing.wav"),
        })
        .await
        .unwrap();
    next_matching(&mut updates, |u| {
        matches!(u, InternalPlayerStateUpdate::Error(_))
    })
    .await;

    let state = get_state(&command_tx).await;
    assert_eq!(state.loaded_file.as_deref(), Some(good.as_path()));

    command_tx.send(PlayerCommand::Shutdown).await.unwrap();
}
