// src/player/run_loop.rs
use super::{command_handler, InternalPlayerStateUpdate, Player, PlayerCommand, PLAYER_LOG_TARGET};
use tracing::{error, info, trace, warn};

/// Runs the player's command processing loop.
pub async fn run_player_loop(player: &mut Player) {
    info!(target: PLAYER_LOG_TARGET, "Player run loop started.");

    loop {
        tokio::select! {
            biased; // Check commands first

            // --- Command Processing ---
            Some(command) = player.command_rx.recv() => {
                trace!(target: PLAYER_LOG_TARGET, "Received command: {:?}", command);
                match command {
                    PlayerCommand::LoadFile { path } => command_handler::handle_load_file(player, path).await,
                    PlayerCommand::Play => command_handler::handle_play(player).await,
                    PlayerCommand::Stop => command_handler::handle_stop(player).await,
                    PlayerCommand::SetPitch { pitch } => command_handler::handle_set_pitch(player, pitch).await,
                    PlayerCommand::GetFullState(responder) => {
                        let state = player.get_full_state();
                        let _ = responder.send(state); // Ignore error if receiver dropped
                    }
                    PlayerCommand::LoadFinished { generation, path, result } => {
                        command_handler::handle_load_finished(player, generation, path, result).await
                    }
                    PlayerCommand::PlaybackFinished => command_handler::handle_playback_finished(player).await,
                    PlayerCommand::Shutdown => {
                        info!(target: PLAYER_LOG_TARGET, "Shutdown command received. Exiting run loop.");
                        player.is_playing = false;
                        player.broadcast_update(InternalPlayerStateUpdate::Stopped);
                        break;
                    }
                }
            }

            // --- Handle Playback Task Completion ---
            // Poll the JoinHandle of the active playback task, if one exists.
            // Natural end is normally announced first via PlaybackFinished
            // (checked above thanks to `biased`), so landing here while still
            // marked playing means the task died without notifying.
            res = async { player.playback_task_manager.as_mut().unwrap().handle().await }, if player.playback_task_manager.is_some() => {
                let finished_manager = player.playback_task_manager.take().unwrap();
                info!(target: PLAYER_LOG_TARGET, path = %finished_manager.path().display(), "Playback task finished polling.");

                if let Err(e) = res {
                    error!(target: PLAYER_LOG_TARGET, path = %finished_manager.path().display(), "Playback task panicked: {:?}", e);
                }

                if player.is_playing {
                    warn!(target: PLAYER_LOG_TARGET, path = %finished_manager.path().display(), "Playback task stopped unexpectedly. Clearing state.");
                    player.is_playing = false;
                    player.broadcast_update(InternalPlayerStateUpdate::Stopped);
                } else {
                    trace!(target: PLAYER_LOG_TARGET, path = %finished_manager.path().display(), "Playback task finished while player was already idle.");
                }
            }

            else => {
                // All channels closed, break the loop
                info!(target: PLAYER_LOG_TARGET, "Command channel closed. Exiting run loop.");
                break;
            }
        }
    }

    info!(target: PLAYER_LOG_TARGET, "Player run loop finished. Performing final cleanup.");
    // 1. Ensure any active playback task is stopped
    if let Some(manager) = player.playback_task_manager.take() {
        info!(target: PLAYER_LOG_TARGET, "Stopping active playback task during final cleanup.");
        manager.stop_task().await;
    }
    // 2. Explicitly shut down the shared audio backend
    info!(target: PLAYER_LOG_TARGET, "Shutting down shared audio backend...");
    match player.audio_backend.lock().await.shutdown().await {
        Ok(_) => info!(target: PLAYER_LOG_TARGET, "Shared audio backend shutdown successful."),
        Err(e) => error!(target: PLAYER_LOG_TARGET, "Error shutting down shared audio backend: {}", e),
    }
    info!(target: PLAYER_LOG_TARGET, "Player task cleanup complete.");
}
