//! Response bodies handed back to whoever fronts the pipeline.

use serde::Serialize;

use tokio::task::JoinError;

use crate::process::{FailureStatus, PipelineError, PipelineOutput};

/// Successful response: only the transcript, never which provider made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptResponse {
    pub transcript: String,
}

/// Failure response with a status code and a human readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub detail: String,
}

impl From<PipelineOutput> for TranscriptResponse {
    fn from(output: PipelineOutput) -> Self {
        Self {
            transcript: output.transcript,
        }
    }
}

impl From<&PipelineError> for ErrorResponse {
    fn from(error: &PipelineError) -> Self {
        Self {
            status: error.status().code(),
            detail: error.to_string(),
        }
    }
}

impl ErrorResponse {
    /// Response for a request whose task died before producing a result.
    pub fn task_failed(error: &JoinError) -> Self {
        let detail = if error.is_panic() {
            format!("Transcription task panicked: {}", error)
        } else {
            format!("Transcription task was cancelled: {}", error)
        };
        Self {
            status: FailureStatus::Internal.code(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use vidscribe_fetch::AcquisitionError;
    use vidscribe_transcribe::Provider;

    use super::*;

    #[test]
    fn test_transcript_response_hides_provider() {
        let response = TranscriptResponse::from(PipelineOutput {
            transcript: "hello world".to_string(),
            provider: Provider::Secondary,
        });
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"transcript":"hello world"}"#
        );
    }

    #[test]
    fn test_error_response_for_small_file() {
        let error = PipelineError::from(AcquisitionError::TooSmall { size: 500, min: 1000 });
        let response = ErrorResponse::from(&error);

        assert_eq!(response.status, 400);
        assert_eq!(
            response.detail,
            "Audio file too small or empty: 500 bytes, need at least 1000"
        );
    }

    #[tokio::test]
    async fn test_error_response_for_cancelled_task() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let error = handle.await.unwrap_err();

        let response = ErrorResponse::task_failed(&error);
        assert_eq!(response.status, 500);
        assert!(response.detail.starts_with("Transcription task was cancelled"));
    }
}
