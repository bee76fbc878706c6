use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vidscribe::cli::{CliArgs, render_result};
use vidscribe::process::TranscriptionPipeline;
use vidscribe::{ConfigManager, DEFAULT_LOG_LEVEL, TranscriptionRequest};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout only carries responses
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VIDSCRIBE_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    // Load config
    let config_manager = match args.config {
        Some(path) => ConfigManager::with_config_path(path),
        None => ConfigManager::new()?,
    };
    let mut config = config_manager.load()?;
    if !config_manager.config_path().exists() {
        // save the defaults so there is a file to edit
        config_manager.save(&config)?;
        info!(path = ?config_manager.config_path(), "Created config file");
    }
    config.apply_env();
    config.log_key_presence();

    let pipeline = Arc::new(TranscriptionPipeline::from_config(&config)?);

    // Requests are independent, run them all at once and report in order
    let handles: Vec<_> = args
        .urls
        .into_iter()
        .map(|url| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let request = TranscriptionRequest::new(url);
                pipeline.run(&request).await
            })
        })
        .collect();

    let mut failures = 0;
    for handle in handles {
        let (line, failed) = render_result(handle.await)?;
        if failed {
            failures += 1;
        }
        println!("{}", line);
    }

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
