//! Transcription backend library for vidscribe.
//!
//! This crate provides a trait-based abstraction for audio transcription,
//! clients for Deepgram and AssemblyAI, and a coordinator that falls back
//! from one provider to the other.

mod assemblyai;
mod deepgram;
mod fallback;
#[cfg(test)]
mod mock_server;

use async_trait::async_trait;
pub use bytes::Bytes;
use thiserror::Error;
use vidscribe_core::AudioResource;

pub use assemblyai::{AssemblyAiClient, AssemblyAiConfig};
pub use deepgram::{DeepgramClient, DeepgramConfig};
pub use fallback::{FallbackTranscriber, Provider, TranscriptionOutcome};

/// Errors that can occur during transcription.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("No API key configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    MalformedResponse(String),

    #[error("Transcript is empty")]
    EmptyTranscript,

    #[error("Provider reported an error: {0}")]
    ProviderStatus(String),

    #[error("Failed to read audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out: {0}")]
    Timeout(String),
}

/// Result type for transcription operations.
pub type Result<T> = std::result::Result<T, TranscribeError>;

/// Trait for transcription backends.
///
/// Each backend reads what it needs from the resource itself: some upload
/// the raw bytes, others hand over a reference to them.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file to text.
    async fn transcribe(&self, audio: &AudioResource) -> Result<String>;

    /// Returns the name of this transcriber for logging/debugging.
    fn name(&self) -> &str;
}

/// Read the whole audio file into memory.
pub(crate) async fn read_audio(audio: &AudioResource) -> Result<Bytes> {
    Ok(Bytes::from(tokio::fs::read(audio.path()).await?))
}

/// Turn a non-2xx response into an [`TranscribeError::ApiError`] with the body.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(TranscribeError::ApiError(format!(
        "API returned {}: {}",
        status, body
    )))
}

/// Reject transcripts with no words in them.
pub(crate) fn non_blank(text: Option<String>) -> Result<String> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(TranscribeError::EmptyTranscript),
    }
}
