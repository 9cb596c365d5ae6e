//! Core download engine
//!
//! Models, stream selection, the HTTP engine, the video and playlist
//! sessions and the task manager live here.

pub mod config;
pub mod downloader;
pub mod manager;
pub mod models;
pub mod playlist;
pub mod progress;
pub mod retry;
pub mod selection;
pub mod source;
pub mod video;

#[cfg(test)]
pub(crate) mod testing;


pub use config::AppConfig;
pub use downloader::{DownloaderConfig, HttpDownloader};
pub use manager::{DownloadEvent, DownloadManager, EventReceiver, EventSender};
pub use models::{
    AppError, AppResult, DownloadConfig, DownloadOption, DownloadStats, DownloadTask,
    PlaylistInfo, PlaylistProgress, ProgressUpdate, StreamInfo, StreamKind, TaskStatus, VideoInfo,
};
pub use playlist::PlaylistDownloader;
pub use retry::RetryPolicy;
pub use source::{VideoSource, YtDlpSource};
pub use video::VideoDownloader;
