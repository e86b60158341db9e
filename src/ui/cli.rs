//! Command-line interface implementation

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

use crate::player::{InternalPlayerState, InternalPlayerStateUpdate, PlaybackMode};
use crate::ui::labels::{self, Labels};

/// Command-line arguments for keyshift
#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal audio player with live pitch shifting", long_about = None)]
pub struct Args {
    /// Audio file to load at startup
    #[arg(short, long, env = "KEYSHIFT_FILE")]
    pub file: Option<PathBuf>,

    /// Initial pitch shift in semitones (-12 to 12)
    #[arg(short, long, env = "KEYSHIFT_PITCH")]
    pub pitch: Option<i32>,

    /// ALSA device to use
    #[arg(short = 'd', long, env = "KEYSHIFT_ALSA_DEVICE")]
    pub alsa_device: Option<String>,

    /// Locale override for UI labels (e.g. "zh-CN")
    #[arg(short, long, env = "KEYSHIFT_LANG")]
    pub lang: Option<String>,

    /// Config file path
    #[arg(short, long, env = "KEYSHIFT_CONFIG")]
    pub config: Option<String>,
}

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Load(PathBuf),
    Play,
    Stop,
    SetPitch(i32),
    PitchUp,
    PitchDown,
    Status,
    Help,
    Quit,
}

/// Parses one line of interactive input into a command.
pub fn parse_command(line: &str) -> Option<UiCommand> {
    let trimmed = line.trim();
    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (trimmed, ""),
    };

    match word.to_lowercase().as_str() {
        "l" | "load" if !rest.is_empty() => Some(UiCommand::Load(PathBuf::from(rest))),
        "p" | "play" => Some(UiCommand::Play),
        "s" | "stop" => Some(UiCommand::Stop),
        "pitch" => rest.parse::<i32>().ok().map(UiCommand::SetPitch),
        "+" | "up" => Some(UiCommand::PitchUp),
        "-" | "down" => Some(UiCommand::PitchDown),
        "st" | "status" => Some(UiCommand::Status),
        "h" | "help" | "?" => Some(UiCommand::Help),
        "q" | "quit" | "exit" => Some(UiCommand::Quit),
        // A bare integer selects a pitch directly, like picking from a list
        // of the 25 values.
        _ if rest.is_empty() => word.parse::<i32>().ok().map(UiCommand::SetPitch),
        _ => None,
    }
}

/// CLI user interface for interacting with the application
pub struct Cli {
    pub args: Args,
    labels: &'static Labels,
}

impl Cli {
    /// Create a new CLI instance
    pub fn new() -> Self {
        Cli {
            args: Args::parse(),
            labels: &labels::EN,
        }
    }

    /// Switches the label set once the effective locale is known.
    pub fn set_labels(&mut self, labels: &'static Labels) {
        self.labels = labels;
    }

    pub fn labels(&self) -> &'static Labels {
        self.labels
    }

    /// Display the application banner
    pub fn display_banner(&self) {
        println!("\n=== {} ===", self.labels.title);
    }

    /// Display the interactive command reference
    pub fn display_help(&self) {
        println!("{}", self.labels.commands);
        println!("  load <path>   {}", self.labels.help_load);
        println!("  play / p      {}", self.labels.play);
        println!("  stop / s      {}", self.labels.stop);
        println!("  pitch <n> / <n>  {} -12..12", self.labels.pitch_label);
        println!("  + / -         {}", self.labels.help_step);
        println!("  status / st   {}", self.labels.help_status);
        println!("  quit / q      {}", self.labels.help_quit);
    }

    /// Display a player state update as a single status line
    pub fn display_update(&self, update: &InternalPlayerStateUpdate) {
        match update {
            InternalPlayerStateUpdate::Loading { path } => {
                println!("{}: {}", self.labels.loading, path.display());
            }
            InternalPlayerStateUpdate::FileLoaded {
                path,
                duration_secs,
            } => {
                println!(
                    "{}: {} ({:.1}s)",
                    self.labels.loaded,
                    path.display(),
                    duration_secs
                );
            }
            InternalPlayerStateUpdate::Playing { path, pitch } => {
                println!(
                    "{}: {}  [{} {}]",
                    self.labels.play,
                    path.display(),
                    self.labels.pitch_label,
                    pitch
                );
            }
            InternalPlayerStateUpdate::Stopped => {
                println!("{}", self.labels.stopped);
            }
            InternalPlayerStateUpdate::PitchChanged { pitch } => {
                println!("{} {}", self.labels.pitch_label, pitch);
            }
            InternalPlayerStateUpdate::Error(msg) => {
                eprintln!("{}: {}", self.labels.error, msg);
            }
        }
    }

    /// Display the full player state
    pub fn display_state(&self, state: &InternalPlayerState) {
        match &state.loaded_file {
            Some(path) => {
                let duration = state.duration_secs.unwrap_or(0.0);
                println!(
                    "{}: {} ({:.1}s)",
                    self.labels.loaded,
                    path.display(),
                    duration
                );
            }
            None => println!("{}", self.labels.no_file),
        }
        let mode = match state.mode {
            PlaybackMode::Playing => self.labels.play,
            PlaybackMode::Idle => self.labels.stopped,
        };
        println!("{}  [{} {}]", mode, self.labels.pitch_label, state.pitch);
    }

    /// Display error messages
    pub fn display_error(&self, error: &dyn Error) {
        eprintln!("{}: {}", self.labels.error, error);
    }

    /// Display the exit message
    pub fn display_goodbye(&self) {
        println!("{}", self.labels.goodbye);
    }
}
