use super::{InternalPlayerStateUpdate, LoadedFile, Player, PlayerCommand, PLAYER_LOG_TARGET};
use crate::audio::{self, PitchShift};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::playback_task;

#[instrument(skip(player), fields(path = %path.display()))]
pub async fn handle_load_file(player: &mut Player, path: PathBuf) {
    info!(target: PLAYER_LOG_TARGET, "Handling LoadFile command for {}.", path.display());

    // Each load gets a fresh generation; a LoadFinished carrying an older
    // generation is the result of a superseded load and is dropped.
    player.load_generation += 1;
    let generation = player.load_generation;
    player.is_loading = true;

    player.broadcast_update(InternalPlayerStateUpdate::Loading { path: path.clone() });

    let cmd_tx = player.internal_command_tx.clone();
    tokio::spawn(async move {
        let decode_path = path.clone();
        let result = tokio::task::spawn_blocking(move || audio::decode_file(&decode_path))
            .await
            .map_err(crate::audio::AudioError::from)
            .and_then(|r| r)
            .map(Arc::new);

        if cmd_tx
            .send(PlayerCommand::LoadFinished {
                generation,
                path,
                result,
            })
            .await
            .is_err()
        {
            warn!(target: PLAYER_LOG_TARGET, "Player command channel closed before LoadFinished could be delivered.");
        }
    });
}

#[instrument(skip(player, result), fields(generation = generation, path = %path.display()))]
pub async fn handle_load_finished(
    player: &mut Player,
    generation: u64,
    path: PathBuf,
    result: Result<Arc<crate::audio::PcmBuffer>, crate::audio::AudioError>,
) {
    if generation != player.load_generation {
        info!(
            target: PLAYER_LOG_TARGET,
            "Discarding stale load result for {} (generation {}, current {}).",
            path.display(), generation, player.load_generation
        );
        return;
    }
    player.is_loading = false;

    match result {
        Ok(buffer) => {
            info!(
                target: PLAYER_LOG_TARGET,
                "File loaded: {} ({:.1}s). Ready to play.",
                path.display(),
                buffer.duration_secs()
            );
            let duration_secs = buffer.duration_secs();
            // An active playback keeps its own Arc to the old buffer and is
            // not interrupted by the swap.
            player.loaded = Some(LoadedFile {
                path: path.clone(),
                buffer,
            });
            player.broadcast_update(InternalPlayerStateUpdate::FileLoaded {
                path,
                duration_secs,
            });
        }
        Err(e) => {
            warn!(target: PLAYER_LOG_TARGET, "Failed to load {}: {}", path.display(), e);
            player.broadcast_update(InternalPlayerStateUpdate::Error(format!(
                "Failed to load {}: {}",
                path.display(),
                e
            )));
        }
    }
}

#[instrument(skip(player))]
pub async fn handle_play(player: &mut Player) {
    info!(target: PLAYER_LOG_TARGET, "Handling Play command.");

    if player.is_playing {
        debug!(target: PLAYER_LOG_TARGET, "Play: Already playing, ignoring.");
        return;
    }

    let loaded = match &player.loaded {
        Some(loaded) => loaded,
        None => {
            warn!(target: PLAYER_LOG_TARGET, "Play: No file loaded, ignoring.");
            return;
        }
    };

    let manager = playback_task::spawn_playback_task(
        Arc::clone(&player.audio_backend),
        Arc::clone(&loaded.buffer),
        Arc::clone(&player.detune),
        loaded.path.clone(),
        player.internal_command_tx.clone(),
    );
    player.playback_task_manager = Some(manager);
    player.is_playing = true;

    player.broadcast_update(InternalPlayerStateUpdate::Playing {
        path: loaded.path.clone(),
        pitch: player.pitch,
    });
}

#[instrument(skip(player))]
pub async fn handle_stop(player: &mut Player) {
    info!(target: PLAYER_LOG_TARGET, "Handling Stop command.");

    if !player.is_playing {
        debug!(target: PLAYER_LOG_TARGET, "Stop: Not playing, ignoring.");
        return;
    }

    if let Some(manager) = player.playback_task_manager.take() {
        manager.stop_task().await;
    }
    player.is_playing = false;
    player.broadcast_update(InternalPlayerStateUpdate::Stopped);
}

#[instrument(skip(player), fields(semitones = pitch.semitones()))]
pub async fn handle_set_pitch(player: &mut Player, pitch: PitchShift) {
    info!(target: PLAYER_LOG_TARGET, "Handling SetPitch command: {} semitones.", pitch);

    if pitch == player.pitch {
        return;
    }
    player.pitch = pitch;
    // The active playback re-reads this atomic each chunk, so the change is
    // audible without restarting.
    player.detune.store(pitch.cents(), Ordering::Relaxed);
    player.broadcast_update(InternalPlayerStateUpdate::PitchChanged { pitch });
}

#[instrument(skip(player))]
pub async fn handle_playback_finished(player: &mut Player) {
    info!(target: PLAYER_LOG_TARGET, "Handling PlaybackFinished internal command.");

    // May race with the run loop noticing the task handle completing; both
    // paths are idempotent.
    if !player.is_playing {
        debug!(target: PLAYER_LOG_TARGET, "PlaybackFinished: Already idle, ignoring.");
        return;
    }

    if let Some(manager) = player.playback_task_manager.take() {
        manager.await_completion().await;
    }
    player.is_playing = false;
    player.broadcast_update(InternalPlayerStateUpdate::Stopped);
}
