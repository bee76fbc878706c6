//! Core types and configuration for vidscribe.
//!
//! This crate provides the data model and configuration shared by the
//! acquisition, transcription and pipeline crates.

mod config;
mod model;

pub use config::{Config, ConfigManager, ASSEMBLY_KEY_ENV, DEEPGRAM_KEY_ENV};
pub use model::{AudioFormat, AudioResource, TranscriptionRequest, UnknownAudioFormat};

/// Application name
pub const APP_NAME: &str = "vidscribe";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";
