//! Ordered fallback between a primary and a secondary transcriber.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};
use vidscribe_core::AudioResource;

use crate::{Result, Transcriber, non_blank};

/// Which side of the fallback produced a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Primary,
    Secondary,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Primary => f.write_str("primary"),
            Provider::Secondary => f.write_str("secondary"),
        }
    }
}

/// Result of running a request through the providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    Success {
        text: String,
        provider: Provider,
    },
    /// Every configured provider failed. `secondary_error` is `None` when
    /// no secondary provider is configured.
    Failure {
        primary_error: String,
        secondary_error: Option<String>,
    },
}

impl TranscriptionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptionOutcome::Success { .. })
    }

    /// Transcript text, if any provider succeeded.
    pub fn text(&self) -> Option<&str> {
        match self {
            TranscriptionOutcome::Success { text, .. } => Some(text),
            TranscriptionOutcome::Failure { .. } => None,
        }
    }
}

enum State {
    Start,
    AttemptingSecondary { primary_error: String },
    Done(TranscriptionOutcome),
}

/// Tries the primary transcriber, then the secondary one if the primary
/// failed for any reason.
///
/// One attempt per provider, strictly in order. Provider errors never
/// escape; they end up as text in [`TranscriptionOutcome::Failure`].
#[derive(Clone)]
pub struct FallbackTranscriber {
    primary: Arc<dyn Transcriber>,
    secondary: Option<Arc<dyn Transcriber>>,
}

impl FallbackTranscriber {
    pub fn new(primary: Arc<dyn Transcriber>, secondary: Option<Arc<dyn Transcriber>>) -> Self {
        Self { primary, secondary }
    }

    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    pub fn secondary_name(&self) -> Option<&str> {
        self.secondary.as_deref().map(|s| s.name())
    }

    pub async fn transcribe(&self, audio: &AudioResource) -> TranscriptionOutcome {
        let mut state = State::Start;
        loop {
            state = match state {
                State::Start => match attempt(self.primary.as_ref(), audio).await {
                    Ok(text) => State::Done(TranscriptionOutcome::Success {
                        text,
                        provider: Provider::Primary,
                    }),
                    Err(e) => {
                        warn!(provider = self.primary.name(), error = %e, "Primary transcription failed");
                        State::AttemptingSecondary {
                            primary_error: e.to_string(),
                        }
                    }
                },
                State::AttemptingSecondary { primary_error } => match &self.secondary {
                    None => State::Done(TranscriptionOutcome::Failure {
                        primary_error,
                        secondary_error: None,
                    }),
                    Some(secondary) => {
                        info!(provider = secondary.name(), "Falling back");
                        match attempt(secondary.as_ref(), audio).await {
                            Ok(text) => State::Done(TranscriptionOutcome::Success {
                                text,
                                provider: Provider::Secondary,
                            }),
                            Err(e) => {
                                warn!(provider = secondary.name(), error = %e, "Fallback transcription failed");
                                State::Done(TranscriptionOutcome::Failure {
                                    primary_error,
                                    secondary_error: Some(e.to_string()),
                                })
                            }
                        }
                    }
                },
                State::Done(outcome) => return outcome,
            };
        }
    }
}

/// One call to one provider. Blank transcripts count as failures whatever
/// the provider says.
async fn attempt(transcriber: &dyn Transcriber, audio: &AudioResource) -> Result<String> {
    let before = Instant::now();
    let text = non_blank(Some(transcriber.transcribe(audio).await?))?;
    info!(
        provider = transcriber.name(),
        duration = ?before.elapsed(),
        chars = text.len(),
        "Transcription successful"
    );
    Ok(text)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use vidscribe_core::AudioFormat;

    use super::*;
    use crate::TranscribeError;

    /// Replays a scripted answer and records every call.
    struct Scripted {
        name: &'static str,
        answer: fn() -> Result<String>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(name: &'static str, answer: fn() -> Result<String>) -> Arc<Self> {
            Arc::new(Self {
                name,
                answer,
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl Transcriber for Scripted {
        async fn transcribe(&self, _audio: &AudioResource) -> Result<String> {
            *self.calls.lock() += 1;
            (self.answer)()
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn audio() -> AudioResource {
        AudioResource::new("/tmp/unused.mp3", 50_000, AudioFormat::Mp3)
    }

    fn ok_primary() -> Result<String> {
        Ok("hello world".to_string())
    }

    fn ok_secondary() -> Result<String> {
        Ok("hello from fallback".to_string())
    }

    fn network_down() -> Result<String> {
        Err(TranscribeError::ApiError("API returned 503: unavailable".to_string()))
    }

    fn job_error() -> Result<String> {
        Err(TranscribeError::ProviderStatus("Transcoding failed".to_string()))
    }

    fn blank() -> Result<String> {
        Ok("   ".to_string())
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let primary = Scripted::new("a", ok_primary);
        let secondary = Scripted::new("b", ok_secondary);
        let fallback = FallbackTranscriber::new(primary.clone(), Some(secondary.clone()));

        let outcome = fallback.transcribe(&audio()).await;

        assert_eq!(
            outcome,
            TranscriptionOutcome::Success {
                text: "hello world".to_string(),
                provider: Provider::Primary,
            }
        );
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back() {
        let primary = Scripted::new("a", network_down);
        let secondary = Scripted::new("b", ok_secondary);
        let fallback = FallbackTranscriber::new(primary.clone(), Some(secondary.clone()));

        let outcome = fallback.transcribe(&audio()).await;

        assert_eq!(outcome.text(), Some("hello from fallback"));
        assert!(matches!(
            outcome,
            TranscriptionOutcome::Success {
                provider: Provider::Secondary,
                ..
            }
        ));
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_primary_counts_as_failure() {
        let primary = Scripted::new("a", blank);
        let secondary = Scripted::new("b", ok_secondary);
        let fallback = FallbackTranscriber::new(primary, Some(secondary.clone()));

        let outcome = fallback.transcribe(&audio()).await;

        assert_eq!(outcome.text(), Some("hello from fallback"));
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_both_fail_keeps_both_errors() {
        let primary = Scripted::new("a", network_down);
        let secondary = Scripted::new("b", job_error);
        let fallback = FallbackTranscriber::new(primary.clone(), Some(secondary.clone()));

        let outcome = fallback.transcribe(&audio()).await;

        match outcome {
            TranscriptionOutcome::Failure {
                primary_error,
                secondary_error,
            } => {
                assert!(primary_error.contains("503"));
                assert_eq!(
                    secondary_error.as_deref(),
                    Some("Provider reported an error: Transcoding failed")
                );
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_secondary_configured() {
        let primary = Scripted::new("a", network_down);
        let fallback = FallbackTranscriber::new(primary, None);

        let outcome = fallback.transcribe(&audio()).await;

        assert!(!outcome.is_success());
        assert!(matches!(
            outcome,
            TranscriptionOutcome::Failure {
                secondary_error: None,
                ..
            }
        ));
        assert_eq!(fallback.secondary_name(), None);
    }
}
