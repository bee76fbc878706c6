//! Acquisition gate: media URL in, guarded local audio file out.

use std::sync::Arc;

use reqwest::Url;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vidscribe_core::{AudioFormat, AudioResource};

use crate::downloader::{DownloadError, Downloader};
use crate::guard::{AudioGuard, remove_audio_file_async};

/// Reasons a request never got a usable audio file.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Invalid source URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to download audio: {0}")]
    DownloadFailed(#[from] DownloadError),

    #[error("Audio file too small or empty: {size} bytes, need at least {min}")]
    TooSmall { size: u64, min: u64 },

    #[error("Failed to access audio file: {0}")]
    Filesystem(#[source] std::io::Error),
}

impl AcquisitionError {
    /// Stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            AcquisitionError::InvalidUrl { .. } => "invalid-url",
            AcquisitionError::DownloadFailed(_) => "download-failed",
            AcquisitionError::TooSmall { .. } => "too-small",
            AcquisitionError::Filesystem(_) => "filesystem",
        }
    }
}

/// Produces a local [`AudioResource`] for a source URL.
///
/// Holds no per-request state; one gate serves any number of concurrent
/// requests.
#[derive(Clone)]
pub struct AcquisitionGate {
    downloader: Arc<dyn Downloader>,
    format: AudioFormat,
    min_audio_bytes: u64,
}

impl AcquisitionGate {
    pub fn new(downloader: Arc<dyn Downloader>, format: AudioFormat, min_audio_bytes: u64) -> Self {
        Self {
            downloader,
            format,
            min_audio_bytes,
        }
    }

    pub fn min_audio_bytes(&self) -> u64 {
        self.min_audio_bytes
    }

    /// Download the audio of `source_url` and check it is worth transcribing.
    ///
    /// The returned guard owns the file. On error no file is left behind.
    pub async fn acquire(&self, source_url: &str) -> Result<AudioGuard, AcquisitionError> {
        let url = Url::parse(source_url.trim()).map_err(|e| AcquisitionError::InvalidUrl {
            url: source_url.to_string(),
            reason: e.to_string(),
        })?;

        let stem = Uuid::new_v4().simple().to_string();
        info!(url = %url, stem = %stem, downloader = self.downloader.name(), "Downloading audio");

        let path = self
            .downloader
            .download(url.as_str(), &stem, self.format)
            .await?;
        info!(path = %path.display(), "Audio file saved");

        let size = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                discard(&path).await;
                return Err(AcquisitionError::Filesystem(e));
            }
        };
        debug!(size, "Audio file size");

        if size < self.min_audio_bytes {
            warn!(size, min = self.min_audio_bytes, "Audio file too small, skipping transcription");
            discard(&path).await;
            return Err(AcquisitionError::TooSmall {
                size,
                min: self.min_audio_bytes,
            });
        }

        Ok(AudioGuard::new(AudioResource::new(path, size, self.format)))
    }
}

async fn discard(path: &std::path::Path) {
    if let Err(e) = remove_audio_file_async(path).await {
        warn!(path = %path.display(), error = %e, "Failed to delete rejected audio file");
    }
}
