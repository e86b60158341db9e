//! Application settings and configuration management

use crate::audio::{MAX_SEMITONES, MIN_SEMITONES};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// ALSA device to use for audio playback
    #[serde(default = "default_alsa_device")]
    pub alsa_device: String,
    /// Locale tag for UI labels; falls back to the environment when unset
    #[serde(default)]
    pub locale: Option<String>,
    /// Pitch shift applied at startup, in semitones
    #[serde(default)]
    pub default_pitch: i32,
}

fn default_alsa_device() -> String {
    "default".to_string()
}

/// Error types for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    ParseError(String),
    ValidationError(String),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigError::ParseError(s) => write!(f, "Parse error: {}", s),
            ConfigError::ValidationError(s) => write!(f, "Validation error: {}", s),
        }
    }
}

impl Error for ConfigError {}

impl Settings {
    /// Create default settings
    pub fn default() -> Self {
        Settings {
            alsa_device: default_alsa_device(),
            locale: None,
            default_pitch: 0,
        }
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self)?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Resolves the effective ALSA device: CLI argument > environment
    /// variable > config file. An explicit "default" from the CLI wins like
    /// any other value.
    pub fn merge_alsa_device(&mut self, cli_device: Option<String>, env_device: Option<String>) {
        if let Some(device) = cli_device.or(env_device) {
            self.alsa_device = device;
        }
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("keyshift").join("config.json")
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alsa_device.is_empty() {
            return Err(ConfigError::ValidationError(
                "ALSA device cannot be empty".to_string(),
            ));
        }

        if !(MIN_SEMITONES..=MAX_SEMITONES).contains(&self.default_pitch) {
            return Err(ConfigError::ValidationError(format!(
                "default_pitch {} outside supported range [{}, {}]",
                self.default_pitch, MIN_SEMITONES, MAX_SEMITONES
            )));
        }

        Ok(())
    }
}
