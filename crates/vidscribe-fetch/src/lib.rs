//! Audio acquisition for vidscribe.
//!
//! Turns a media URL into a local audio file through an external downloader,
//! rejects downloads too small to hold real audio, and hands the file out
//! wrapped in a guard that deletes it when the request is done.

mod downloader;
mod gate;
mod guard;

pub use downloader::{DownloadError, Downloader, YtDlpDownloader};
pub use gate::{AcquisitionError, AcquisitionGate};
pub use guard::{AudioGuard, remove_audio_file, remove_audio_file_async};
