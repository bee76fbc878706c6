use std::path::PathBuf;

use clap::Parser;
use tokio::task::JoinError;
use tracing::error;

use crate::process::{PipelineError, PipelineOutput};
use crate::response::{ErrorResponse, TranscriptResponse};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "vidscribe",
    version,
    about = "Download the audio of media URLs and print their transcripts"
)]
pub struct CliArgs {
    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Media URLs to transcribe, one JSON line is printed per URL
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,
}

/// Renders the result of one request task as a JSON line. The flag is true
/// when the line reports a failure.
pub fn render_result(
    result: Result<Result<PipelineOutput, PipelineError>, JoinError>,
) -> serde_json::Result<(String, bool)> {
    match result {
        Ok(Ok(output)) => Ok((serde_json::to_string(&TranscriptResponse::from(output))?, false)),
        Ok(Err(e)) => {
            error!(status = e.status().code(), "{}", e);
            Ok((serde_json::to_string(&ErrorResponse::from(&e))?, true))
        }
        Err(e) => {
            // A task that died still gets its own line
            let response = ErrorResponse::task_failed(&e);
            error!(status = response.status, "{}", response.detail);
            Ok((serde_json::to_string(&response)?, true))
        }
    }
}
