//! AssemblyAI transcription backend.
//!
//! AssemblyAI works on jobs: the audio is uploaded, a transcript job is
//! created pointing at the upload, and the job is polled until it either
//! completes or reports an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vidscribe_core::AudioResource;

use crate::{Result, TranscribeError, Transcriber, check_status, non_blank, read_audio};

const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com";
const DEFAULT_SPEECH_MODEL: &str = "best";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_MAX_POLLS: u32 = 600;

/// Configuration for the AssemblyAI client.
#[derive(Debug, Clone)]
pub struct AssemblyAiConfig {
    /// AssemblyAI API key
    pub api_key: String,

    /// Speech model to use (defaults to best)
    pub speech_model: Option<String>,

    /// Delay between job status checks
    pub poll_interval: Duration,

    /// Give up after this many status checks
    pub max_polls: u32,

    /// API root, for testing
    pub base_url: Option<String>,
}

impl AssemblyAiConfig {
    /// Create a new AssemblyAI config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            speech_model: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
            base_url: None,
        }
    }

    /// Set the speech model to use.
    pub fn with_speech_model(mut self, model: impl Into<String>) -> Self {
        self.speech_model = Some(model.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Get the speech model, using default if not set.
    pub fn speech_model(&self) -> &str {
        self.speech_model.as_deref().unwrap_or(DEFAULT_SPEECH_MODEL)
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/v2/{}", base.trim_end_matches('/'), path)
    }
}

/// AssemblyAI API client.
#[derive(Debug, Clone)]
pub struct AssemblyAiClient {
    client: reqwest::Client,
    config: AssemblyAiConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    speech_model: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranscriptJob {
    id: String,
    status: JobStatus,
    text: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl TranscriptJob {
    /// The final result, or `None` while the job is still running.
    fn finish(self) -> Option<Result<String>> {
        match self.status {
            JobStatus::Completed => Some(non_blank(self.text)),
            JobStatus::Error => Some(Err(TranscribeError::ProviderStatus(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))),
            JobStatus::Queued | JobStatus::Processing | JobStatus::Unknown => None,
        }
    }
}

impl AssemblyAiClient {
    /// Create a new AssemblyAI client with the given configuration.
    pub fn new(config: AssemblyAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a client from just an API key with default settings.
    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        Self::new(AssemblyAiConfig::new(api_key))
    }

    /// Use a preconfigured HTTP client, e.g. to share a connection pool.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn upload(&self, audio: &AudioResource) -> Result<String> {
        let bytes = read_audio(audio).await?;
        debug!(audio_bytes = bytes.len(), "Uploading audio to AssemblyAI");

        let response = self
            .client
            .post(self.config.endpoint("upload"))
            .header(AUTHORIZATION, &self.config.api_key)
            .body(bytes)
            .send()
            .await?;

        let upload: UploadResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| TranscribeError::MalformedResponse(e.to_string()))?;
        Ok(upload.upload_url)
    }

    async fn submit(&self, audio_url: &str) -> Result<TranscriptJob> {
        let request = TranscriptRequest {
            audio_url,
            speech_model: self.config.speech_model(),
        };
        let response = self
            .client
            .post(self.config.endpoint("transcript"))
            .header(AUTHORIZATION, &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| TranscribeError::MalformedResponse(e.to_string()))
    }

    async fn poll(&self, id: &str) -> Result<TranscriptJob> {
        let response = self
            .client
            .get(self.config.endpoint(&format!("transcript/{}", id)))
            .header(AUTHORIZATION, &self.config.api_key)
            .send()
            .await?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| TranscribeError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl Transcriber for AssemblyAiClient {
    async fn transcribe(&self, audio: &AudioResource) -> Result<String> {
        if self.config.api_key.is_empty() {
            return Err(TranscribeError::NoApiKey);
        }

        let audio_url = self.upload(audio).await?;
        let mut job = self.submit(&audio_url).await?;
        let id = job.id.clone();
        info!(id = %id, speech_model = self.config.speech_model(), "AssemblyAI job created");

        for _ in 0..self.config.max_polls {
            if let Some(result) = job.finish() {
                return result;
            }
            tokio::time::sleep(self.config.poll_interval).await;
            job = self.poll(&id).await?;
            debug!(id = %id, status = ?job.status, "AssemblyAI job status");
        }

        job.finish().unwrap_or_else(|| {
            Err(TranscribeError::Timeout(format!(
                "AssemblyAI job {} still running after {} polls",
                id, self.config.max_polls
            )))
        })
    }

    fn name(&self) -> &str {
        "assemblyai"
    }
}
