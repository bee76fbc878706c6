use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};
use thiserror::Error;
use tracing::{info, warn};
use vidscribe_core::{Config, TranscriptionRequest};
use vidscribe_fetch::{AcquisitionError, AcquisitionGate, YtDlpDownloader};
use vidscribe_transcribe::{
    AssemblyAiClient, AssemblyAiConfig, DeepgramClient, DeepgramConfig, FallbackTranscriber,
    Provider, Transcriber, TranscriptionOutcome,
};

/// Request pipeline: download the audio, transcribe it with fallback, and
/// delete the audio file whatever happened.
///
/// Holds only immutable collaborators, so one instance can serve any
/// number of concurrent requests.
#[derive(Clone)]
pub struct TranscriptionPipeline {
    gate: AcquisitionGate,
    transcriber: FallbackTranscriber,
}

/// A successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub transcript: String,
    /// Which side of the fallback answered. Not part of the response.
    pub provider: Provider,
}

/// Caller-visible failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStatus {
    /// The request could not be turned into usable audio.
    BadRequest,
    /// Every transcription provider failed.
    Internal,
}

impl FailureStatus {
    /// HTTP-style status code.
    pub fn code(self) -> u16 {
        match self {
            FailureStatus::BadRequest => 400,
            FailureStatus::Internal => 500,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error("{}", describe_failure(.primary, .primary_error, .secondary, .secondary_error))]
    AllProvidersFailed {
        primary: String,
        primary_error: String,
        secondary: Option<String>,
        secondary_error: Option<String>,
    },
}

impl PipelineError {
    pub fn status(&self) -> FailureStatus {
        match self {
            PipelineError::Acquisition(_) => FailureStatus::BadRequest,
            PipelineError::AllProvidersFailed { .. } => FailureStatus::Internal,
        }
    }
}

fn describe_failure(
    primary: &str,
    primary_error: &str,
    secondary: &Option<String>,
    secondary_error: &Option<String>,
) -> String {
    match (secondary, secondary_error) {
        (Some(secondary), Some(secondary_error)) => format!(
            "Both {} and {} failed: {}: {}; {}: {}",
            primary, secondary, primary, primary_error, secondary, secondary_error
        ),
        _ => format!(
            "{} failed and no fallback is configured: {}",
            primary, primary_error
        ),
    }
}

impl TranscriptionPipeline {
    pub fn new(gate: AcquisitionGate, transcriber: FallbackTranscriber) -> Self {
        Self { gate, transcriber }
    }

    /// Build the production pipeline: yt-dlp, Deepgram first, AssemblyAI
    /// as fallback when its key is set.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let Some(deepgram_key) = config.key_deepgram() else {
            bail!(
                "Deepgram API key is not set. Add deepgram_key to the config file or set {}.",
                vidscribe_core::DEEPGRAM_KEY_ENV
            );
        };

        let download_dir = config.download_dir();
        std::fs::create_dir_all(&download_dir).with_context(|| {
            format!("Failed to create download directory at {:?}", download_dir)
        })?;
        let downloader = YtDlpDownloader::new(download_dir).with_program(config.downloader.clone());
        let gate = AcquisitionGate::new(
            Arc::new(downloader),
            config.audio_format,
            config.min_audio_bytes,
        );

        // Both providers share one connection pool
        let http = reqwest::Client::new();
        let primary: Arc<dyn Transcriber> = Arc::new(
            DeepgramClient::new(
                DeepgramConfig::new(deepgram_key).with_language(config.language.clone()),
            )
            .with_http_client(http.clone()),
        );
        let secondary: Option<Arc<dyn Transcriber>> = match config.key_assemblyai() {
            Some(key) => Some(Arc::new(
                AssemblyAiClient::new(
                    AssemblyAiConfig::new(key)
                        .with_speech_model(config.speech_model.clone())
                        .with_poll_interval(config.poll_interval()),
                )
                .with_http_client(http),
            )),
            None => {
                warn!("AssemblyAI API key is not set, transcription will not fall back");
                None
            }
        };

        Ok(Self::new(gate, FallbackTranscriber::new(primary, secondary)))
    }

    /// Run one request to completion.
    ///
    /// The downloaded file is gone by the time this returns, including when
    /// transcription fails or the future is dropped part way.
    pub async fn run(&self, request: &TranscriptionRequest) -> Result<PipelineOutput, PipelineError> {
        let before = Instant::now();
        let mut audio = self.gate.acquire(request.source_url()).await?;

        let outcome = self.transcriber.transcribe(audio.resource()).await;

        if let Err(e) = audio.release_async().await {
            warn!(path = %audio.path().display(), error = %e, "Failed to delete temp audio file");
        }

        match outcome {
            TranscriptionOutcome::Success { text, provider } => {
                info!(
                    url = request.source_url(),
                    %provider,
                    duration = ?before.elapsed(),
                    "Request completed"
                );
                Ok(PipelineOutput {
                    transcript: text,
                    provider,
                })
            }
            TranscriptionOutcome::Failure {
                primary_error,
                secondary_error,
            } => Err(PipelineError::AllProvidersFailed {
                primary: self.transcriber.primary_name().to_string(),
                primary_error,
                secondary: self.transcriber.secondary_name().map(str::to_string),
                secondary_error,
            }),
        }
    }
}
