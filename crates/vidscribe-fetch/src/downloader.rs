//! Media download capability and its yt-dlp implementation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};
use vidscribe_core::AudioFormat;

/// Errors that can occur while downloading media.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Download reported success but {0:?} does not exist")]
    MissingOutput(PathBuf),

    #[error("Download failed: {0}")]
    Other(String),
}

/// Fetches the audio track of a media URL into a local file.
///
/// Implementations write to `<some dir>/<stem>.<format extension>` and
/// return that path. On failure they leave nothing behind.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(
        &self,
        url: &str,
        stem: &str,
        format: AudioFormat,
    ) -> Result<PathBuf, DownloadError>;

    /// Returns the name of this downloader for logging/debugging.
    fn name(&self) -> &str;
}

/// Downloads with the `yt-dlp` executable, converting through ffmpeg.
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    program: String,
    output_dir: PathBuf,
}

impl YtDlpDownloader {
    /// Create a downloader writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "yt-dlp".to_string(),
            output_dir: output_dir.into(),
        }
    }

    /// Use a different executable, e.g. an absolute path.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path the converted audio ends up at.
    pub fn output_path(&self, stem: &str, format: AudioFormat) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", stem, format.extension()))
    }

    fn args(&self, url: &str, stem: &str, format: AudioFormat) -> Vec<OsString> {
        let template = self.output_dir.join(format!("{}.%(ext)s", stem));
        vec![
            "--quiet".into(),
            "--no-playlist".into(),
            "--format".into(),
            "bestaudio/best".into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            format.extension().into(),
            "--output".into(),
            template.into_os_string(),
            "--".into(),
            url.into(),
        ]
    }

    /// Remove whatever a failed run left behind for `stem`.
    async fn remove_partials(&self, stem: &str) {
        let mut entries = match tokio::fs::read_dir(&self.output_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.output_dir.display(), error = %e, "Cannot scan for partial downloads");
                return;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            if !entry.file_name().to_string_lossy().starts_with(stem) {
                continue;
            }
            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed partial download"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial download"),
            }
        }
    }
}

/// Removes the files of an in-flight download unless disarmed.
///
/// Covers the download future being dropped while yt-dlp is still writing,
/// where no async cleanup can run.
struct PartialDownloads<'a> {
    dir: &'a Path,
    stem: &'a str,
    armed: bool,
}

impl<'a> PartialDownloads<'a> {
    fn new(dir: &'a Path, stem: &'a str) -> Self {
        Self {
            dir,
            stem,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialDownloads<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let entries = match std::fs::read_dir(self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Cannot scan for partial downloads");
                return;
            }
        };
        for entry in entries.flatten() {
            if !entry.file_name().to_string_lossy().starts_with(self.stem) {
                continue;
            }
            let path = entry.path();
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed abandoned download"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove abandoned download"),
            }
        }
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(
        &self,
        url: &str,
        stem: &str,
        format: AudioFormat,
    ) -> Result<PathBuf, DownloadError> {
        debug!(program = %self.program, url, stem, %format, "Starting download");

        let mut partials = PartialDownloads::new(&self.output_dir, stem);
        let output = match Command::new(&self.program)
            .args(self.args(url, stem, format))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) => output,
            Err(source) => {
                partials.disarm();
                return Err(DownloadError::Spawn {
                    program: self.program.clone(),
                    source,
                });
            }
        };

        if !output.status.success() {
            self.remove_partials(stem).await;
            partials.disarm();
            return Err(DownloadError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let path = self.output_path(stem, format);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            self.remove_partials(stem).await;
            partials.disarm();
            return Err(DownloadError::MissingOutput(path));
        }

        partials.disarm();
        Ok(path)
    }

    fn name(&self) -> &str {
        &self.program
    }
}
