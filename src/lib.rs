// Re-export from sub-crates
pub use vidscribe_core::{
    APP_NAME, AudioFormat, AudioResource, Config, ConfigManager, DEFAULT_LOG_LEVEL,
    TranscriptionRequest,
};
pub use vidscribe_fetch::{
    AcquisitionError, AcquisitionGate, AudioGuard, DownloadError, Downloader, YtDlpDownloader,
};
pub use vidscribe_transcribe::{
    AssemblyAiClient, AssemblyAiConfig, DeepgramClient, DeepgramConfig, FallbackTranscriber,
    Provider, TranscribeError, Transcriber, TranscriptionOutcome,
};

// App-specific modules
pub mod cli;
pub mod process;
pub mod response;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
