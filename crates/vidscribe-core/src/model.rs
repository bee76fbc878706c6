//! Request and audio resource types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single transcription request: the media URL to transcribe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TranscriptionRequest {
    /// URL of the media whose audio track should be transcribed
    #[serde(alias = "youtube_url")]
    source_url: String,
}

impl TranscriptionRequest {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

/// A downloaded audio file on local storage.
///
/// Immutable once created. Deleting the backing file is the job of the
/// guard that owns it, not of this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioResource {
    path: PathBuf,
    size_bytes: u64,
    format: AudioFormat,
}

impl AudioResource {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64, format: AudioFormat) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            format,
        }
    }

    /// Location of the audio file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file as measured right after the download.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }
}

/// Audio encoding the downloader normalizes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    M4a,
    Opus,
    Wav,
    Flac,
}

#[derive(Debug, Error)]
#[error("Unknown audio format: {0}")]
pub struct UnknownAudioFormat(String);

impl AudioFormat {
    /// File extension, also the codec name understood by yt-dlp.
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Opus => "opus",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mp3",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Opus => "audio/ogg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = UnknownAudioFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "m4a" => Ok(AudioFormat::M4a),
            "opus" => Ok(AudioFormat::Opus),
            "wav" => Ok(AudioFormat::Wav),
            "flac" => Ok(AudioFormat::Flac),
            other => Err(UnknownAudioFormat(other.to_string())),
        }
    }
}
