//! YouTube video and playlist downloader
//!
//! Downloads single videos or whole playlists in one of three quality
//! presets (720p, 360p, audio-only), with progress reporting, retries
//! and a task manager for batch downloads.

pub mod cli;
pub mod commands;
pub mod core;
pub mod utils;

pub use crate::core::config::AppConfig;
pub use crate::core::manager::{DownloadEvent, DownloadManager};
pub use crate::core::models::{
    AppError, AppResult, DownloadConfig, DownloadOption, DownloadTask, TaskStatus,
};
pub use crate::core::playlist::PlaylistDownloader;
pub use crate::core::source::{VideoSource, YtDlpSource};
pub use crate::core::video::VideoDownloader;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` overrides the default filter.
pub fn init() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ytdownloader=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("{} v{} initialized", NAME, VERSION);
}
