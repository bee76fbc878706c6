//! Configuration management for vidscribe.
//!
//! The configuration is read once at startup and handed to the acquisition
//! gate and the provider clients. Nothing mutates it afterwards.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::APP_NAME;
use crate::model::AudioFormat;

/// Environment variable that overrides the Deepgram key.
pub const DEEPGRAM_KEY_ENV: &str = "DEEPGRAM_API_KEY";

/// Environment variable that overrides the AssemblyAI key.
pub const ASSEMBLY_KEY_ENV: &str = "ASSEMBLY_API_KEY";

/// Core configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Deepgram API key, used by the primary provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepgram_key: Option<String>,

    /// AssemblyAI API key, used by the fallback provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assemblyai_key: Option<String>,

    /// Transcription language sent to the primary provider
    #[serde(default = "default_language", skip_serializing_if = "is_default_language")]
    pub language: String,

    /// Speech model requested from the fallback provider
    #[serde(
        default = "default_speech_model",
        skip_serializing_if = "is_default_speech_model"
    )]
    pub speech_model: String,

    /// Downloads smaller than this are treated as empty or corrupt
    #[serde(
        default = "default_min_audio_bytes",
        skip_serializing_if = "is_default_min_audio_bytes"
    )]
    pub min_audio_bytes: u64,

    /// Encoding the downloaded audio is converted to
    #[serde(default, skip_serializing_if = "is_default_audio_format")]
    pub audio_format: AudioFormat,

    /// Where downloaded audio is written. Defaults to the system temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,

    /// Downloader executable
    #[serde(
        default = "default_downloader",
        skip_serializing_if = "is_default_downloader"
    )]
    pub downloader: String,

    /// Delay between status checks of a fallback transcription job
    #[serde(
        default = "default_poll_interval_ms",
        skip_serializing_if = "is_default_poll_interval_ms"
    )]
    pub poll_interval_ms: u64,
}

fn default_language() -> String {
    "en".to_string()
}

fn is_default_language(v: &String) -> bool {
    v == "en"
}

fn default_speech_model() -> String {
    "best".to_string()
}

fn is_default_speech_model(v: &String) -> bool {
    v == "best"
}

fn default_min_audio_bytes() -> u64 {
    1000
}

fn is_default_min_audio_bytes(v: &u64) -> bool {
    *v == 1000
}

fn is_default_audio_format(v: &AudioFormat) -> bool {
    *v == AudioFormat::default()
}

fn default_downloader() -> String {
    "yt-dlp".to_string()
}

fn is_default_downloader(v: &String) -> bool {
    v == "yt-dlp"
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn is_default_poll_interval_ms(v: &u64) -> bool {
    *v == 3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deepgram_key: None,
            assemblyai_key: None,
            language: default_language(),
            speech_model: default_speech_model(),
            min_audio_bytes: default_min_audio_bytes(),
            audio_format: AudioFormat::default(),
            download_dir: None,
            downloader: default_downloader(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Get the Deepgram API key
    pub fn key_deepgram(&self) -> Option<&str> {
        self.deepgram_key.as_deref()
    }

    /// Get the AssemblyAI API key
    pub fn key_assemblyai(&self) -> Option<&str> {
        self.assemblyai_key.as_deref()
    }

    /// Directory for downloaded audio
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Override API keys from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Override API keys from `lookup`. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v: &String| !v.trim().is_empty());
        if let Some(key) = non_empty(DEEPGRAM_KEY_ENV) {
            self.deepgram_key = Some(key);
        }
        if let Some(key) = non_empty(ASSEMBLY_KEY_ENV) {
            self.assemblyai_key = Some(key);
        }
    }

    /// Log which keys are present, never their values.
    pub fn log_key_presence(&self) {
        info!(
            deepgram = self.key_deepgram().is_some(),
            assemblyai = self.key_assemblyai().is_some(),
            "API keys present"
        );
    }
}

/// Manages loading and saving configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the default configuration directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a ConfigManager for an explicit file path.
    pub fn with_config_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    /// Creates a new ConfigManager with a specified configuration directory.
    #[cfg(test)]
    pub fn with_config_dir<P: AsRef<Path>>(dir: P) -> Self {
        let config_path = dir.as_ref().join(format!("{}.toml", APP_NAME));
        Self { config_path }
    }

    /// Returns the default path to the configuration file.
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
    }

    /// Loads the configuration from the config file or returns default.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;

        if config.key_deepgram().is_none() {
            debug!(
                path = ?self.config_path,
                "Deepgram API key not in config file, expecting {}",
                DEEPGRAM_KEY_ENV
            );
        }

        Ok(config)
    }

    /// Saves the configuration to the config file.
    pub fn save(&self, config: &Config) -> Result<()> {
        let config_dir = self
            .config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))?;

        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))?;

        let serialized =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;

        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
