use keyshift::audio::{PitchShift, PlaybackEngine};
use keyshift::config::Settings;
use keyshift::init_app_dirs;
use keyshift::player::{InternalPlayerState, Player, PlayerCommand};
use keyshift::ui::{labels, parse_command, Cli, UiCommand};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{error, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_TARGET: &str = "keyshift::main";

/// Fetches a state snapshot from the player task.
async fn query_state(
    command_tx: &mpsc::Sender<PlayerCommand>,
) -> Option<InternalPlayerState> {
    let (tx, rx) = oneshot::channel();
    if command_tx
        .send(PlayerCommand::GetFullState(tx))
        .await
        .is_err()
    {
        return None;
    }
    rx.await.ok()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr; stdout is reserved for the UI.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Parse command-line arguments and initialize CLI
    let mut cli = Cli::new();

    // Initialize application directories
    init_app_dirs()?;

    // Load configuration from file or create default
    let config_path = match &cli.args.config {
        Some(path) => Path::new(path).to_path_buf(),
        None => Settings::default_path(),
    };
    let mut settings = Settings::load(&config_path)?;

    // Determine ALSA device: CLI arg > Env Var > config file
    settings.merge_alsa_device(
        cli.args.alsa_device.clone(),
        std::env::var("ALSA_DEVICE").ok(),
    );

    if let Some(lang) = &cli.args.lang {
        settings.locale = Some(lang.clone());
    }
    settings.validate()?;

    // Resolve UI language: explicit setting, else environment locale
    let locale = settings
        .locale
        .clone()
        .unwrap_or_else(labels::detect_locale);
    cli.set_labels(labels::for_locale(&locale));

    // Spawn the player task with a real ALSA backend
    let backend = Box::new(PlaybackEngine::new(&settings.alsa_device));
    let (mut player, command_tx) = Player::new(backend, 32, 32);
    let mut updates = player.subscribe_state_updates();
    let player_handle = tokio::spawn(async move { player.run().await });

    // Apply startup pitch and file, if any
    let initial_pitch = cli.args.pitch.unwrap_or(settings.default_pitch);
    if initial_pitch != 0 {
        let pitch = PitchShift::new(initial_pitch)?;
        command_tx.send(PlayerCommand::SetPitch { pitch }).await?;
    }
    if let Some(file) = cli.args.file.clone() {
        command_tx.send(PlayerCommand::LoadFile { path: file }).await?;
    }

    cli.display_banner();
    cli.display_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            // --- User input ---
            maybe_line = lines.next_line() => {
                let line = match maybe_line? {
                    Some(line) => line,
                    None => {
                        // stdin closed
                        let _ = command_tx.send(PlayerCommand::Shutdown).await;
                        break;
                    }
                };
                match parse_command(&line) {
                    Some(UiCommand::Load(path)) => {
                        command_tx.send(PlayerCommand::LoadFile { path }).await?;
                    }
                    Some(UiCommand::Play) => {
                        command_tx.send(PlayerCommand::Play).await?;
                    }
                    Some(UiCommand::Stop) => {
                        command_tx.send(PlayerCommand::Stop).await?;
                    }
                    Some(UiCommand::SetPitch(semitones)) => {
                        match PitchShift::new(semitones) {
                            Ok(pitch) => command_tx.send(PlayerCommand::SetPitch { pitch }).await?,
                            Err(e) => cli.display_error(&e),
                        }
                    }
                    Some(cmd @ (UiCommand::PitchUp | UiCommand::PitchDown)) => {
                        if let Some(state) = query_state(&command_tx).await {
                            let pitch = if cmd == UiCommand::PitchUp {
                                state.pitch.up()
                            } else {
                                state.pitch.down()
                            };
                            command_tx.send(PlayerCommand::SetPitch { pitch }).await?;
                        }
                    }
                    Some(UiCommand::Status) => {
                        if let Some(state) = query_state(&command_tx).await {
                            cli.display_state(&state);
                        }
                    }
                    Some(UiCommand::Help) => cli.display_help(),
                    Some(UiCommand::Quit) => {
                        let _ = command_tx.send(PlayerCommand::Shutdown).await;
                        break;
                    }
                    None => {
                        if !line.trim().is_empty() {
                            cli.display_help();
                        }
                    }
                }
            }

            // --- Player state updates ---
            update = updates.recv() => {
                match update {
                    Ok(update) => cli.display_update(&update),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(target: LOG_TARGET, "Missed {} state updates.", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        error!(target: LOG_TARGET, "Player state channel closed unexpectedly.");
                        break;
                    }
                }
            }

            // --- Ctrl+C ---
            _ = tokio::signal::ctrl_c() => {
                let _ = command_tx.send(PlayerCommand::Shutdown).await;
                break;
            }
        }
    }

    // Wait for the player to finish cleanup (stops playback, releases ALSA).
    if tokio::time::timeout(Duration::from_secs(10), player_handle)
        .await
        .is_err()
    {
        error!(target: LOG_TARGET, "Player task did not shut down in time.");
    }

    cli.display_goodbye();
    Ok(())
}
