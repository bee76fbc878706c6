//! Deepgram pre-recorded audio transcription backend.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::debug;
use vidscribe_core::AudioResource;

use crate::{Result, TranscribeError, Transcriber, check_status, non_blank, read_audio};

const DEFAULT_BASE_URL: &str = "https://api.deepgram.com";
const DEFAULT_LANGUAGE: &str = "en";

/// Configuration for the Deepgram client.
#[derive(Debug, Clone)]
pub struct DeepgramConfig {
    /// Deepgram API key
    pub api_key: String,

    /// Transcription language (defaults to en)
    pub language: Option<String>,

    /// Ask for punctuation in the transcript
    pub punctuate: bool,

    /// API root, for testing or self-hosted deployments
    pub base_url: Option<String>,
}

impl DeepgramConfig {
    /// Create a new Deepgram config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            language: None,
            punctuate: true,
            base_url: None,
        }
    }

    /// Set the transcription language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Get the language, using default if not set.
    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }

    fn listen_url(&self) -> String {
        let base = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/v1/listen", base.trim_end_matches('/'))
    }
}

/// Deepgram API client.
#[derive(Debug, Clone)]
pub struct DeepgramClient {
    client: reqwest::Client,
    config: DeepgramConfig,
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: Option<ListenResults>,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    transcript: Option<String>,
}

impl DeepgramClient {
    /// Create a new Deepgram client with the given configuration.
    pub fn new(config: DeepgramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a client from just an API key with default settings.
    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        Self::new(DeepgramConfig::new(api_key))
    }

    /// Use a preconfigured HTTP client, e.g. to share a connection pool.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

/// Pull `results.channels[0].alternatives[0].transcript` out of a response body.
fn extract_transcript(body: &str) -> Result<String> {
    let response: ListenResponse = serde_json::from_str(body)
        .map_err(|e| TranscribeError::MalformedResponse(e.to_string()))?;

    let alternative = response
        .results
        .and_then(|r| r.channels.into_iter().next())
        .and_then(|c| c.alternatives.into_iter().next())
        .ok_or_else(|| {
            TranscribeError::MalformedResponse(
                "missing results.channels[0].alternatives[0]".to_string(),
            )
        })?;

    non_blank(alternative.transcript)
}

#[async_trait]
impl Transcriber for DeepgramClient {
    async fn transcribe(&self, audio: &AudioResource) -> Result<String> {
        if self.config.api_key.is_empty() {
            return Err(TranscribeError::NoApiKey);
        }

        let bytes = read_audio(audio).await?;
        debug!(
            audio_bytes = bytes.len(),
            language = self.config.language(),
            punctuate = self.config.punctuate,
            "Sending transcription request to Deepgram"
        );

        let response = self
            .client
            .post(self.config.listen_url())
            .query(&[
                ("punctuate", self.config.punctuate.to_string().as_str()),
                ("language", self.config.language()),
            ])
            .header(AUTHORIZATION, format!("Token {}", self.config.api_key))
            .header(CONTENT_TYPE, audio.format().mime_type())
            .body(bytes)
            .send()
            .await?;

        let body = check_status(response).await?.text().await?;
        extract_transcript(&body)
    }

    fn name(&self) -> &str {
        "deepgram"
    }
}
