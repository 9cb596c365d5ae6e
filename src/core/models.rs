//! Core data models for the YouTube downloader

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Task status enumeration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

/// Stream kind: video or audio-only
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
        }
    }
}

/// Stream selection criteria for a download.
///
/// A `None` resolution or abr acts as a wildcard; the other fields must
/// match a stream exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DownloadOption {
    pub resolution: Option<String>,
    pub kind: StreamKind,
    pub progressive: bool,
    pub abr: Option<String>,
}

impl DownloadOption {
    /// 720p progressive video
    pub fn hd() -> Self {
        Self {
            resolution: Some("720p".to_string()),
            kind: StreamKind::Video,
            progressive: true,
            abr: None,
        }
    }

    /// 360p progressive video
    pub fn ld() -> Self {
        Self {
            resolution: Some("360p".to_string()),
            kind: StreamKind::Video,
            progressive: true,
            abr: None,
        }
    }

    /// Audio-only at 128kbps
    pub fn audio() -> Self {
        Self {
            resolution: None,
            kind: StreamKind::Audio,
            progressive: false,
            abr: Some("128kbps".to_string()),
        }
    }

    /// Human-readable label used in messages and reports
    pub fn label(&self) -> String {
        match &self.resolution {
            Some(resolution) => resolution.clone(),
            None => self.kind.as_str().to_string(),
        }
    }
}

/// A single downloadable stream of a video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    pub format_id: String,
    pub ext: String,
    pub kind: StreamKind,
    /// Video resolution label, e.g. "720p"
    pub resolution: Option<String>,
    /// Audio bitrate label, e.g. "128kbps"
    pub abr: Option<String>,
    /// Whether the stream carries both video and audio
    pub progressive: bool,
    pub filesize: Option<u64>,
    /// Direct media URL, when the backend resolved one
    pub url: Option<String>,
}

/// Metadata and streams for a single video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub channel_url: Option<String>,
    pub duration_seconds: u64,
    pub views: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub streams: Vec<StreamInfo>,
}

/// One entry of a playlist (title and watch URL, no streams)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub id: String,
    pub url: String,
    pub title: String,
}

/// Playlist metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub url: String,
    pub title: String,
    pub owner: Option<String>,
    pub owner_url: Option<String>,
    pub views: Option<u64>,
    pub last_updated: Option<String>,
    pub entries: Vec<PlaylistEntry>,
}

impl PlaylistInfo {
    pub fn video_count(&self) -> usize {
        self.entries.len()
    }
}

/// Byte-level progress information for one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub task_id: String,
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    /// Percent completed (0.0 - 100.0)
    pub percent: f64,
    /// Download speed in bytes per second
    pub speed: f64,
    pub eta_seconds: Option<u64>,
}

/// Per-item progress of a playlist download ("n of N")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistProgress {
    pub completed: usize,
    pub total: usize,
    pub current_title: String,
}

/// A download task tracked by the manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTask {
    pub id: String,
    pub url: String,
    pub title: String,
    pub option: DownloadOption,
    pub output_dir: PathBuf,
    pub status: TaskStatus,
    pub progress: f64,
    pub file_size: Option<u64>,
    pub downloaded_size: u64,
    pub speed: f64,
    pub eta: Option<u64>,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    pub concurrent_downloads: usize,
    pub retry_attempts: usize,
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub output_directory: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrent_downloads: 3,
            retry_attempts: 3,
            timeout_seconds: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            output_directory: "downloads".to_string(),
        }
    }
}

/// Aggregate download statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub total_downloaded: u64,
    pub average_speed: f64,
    pub active_downloads: usize,
}

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("This resolution is unavailable: {0}")]
    Unavailable(String),

    #[error("Please select a download directory")]
    MissingFolder,

    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Download cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_presets() {
        let hd = DownloadOption::hd();
        assert_eq!(hd.resolution.as_deref(), Some("720p"));
        assert_eq!(hd.kind, StreamKind::Video);
        assert!(hd.progressive);
        assert!(hd.abr.is_none());

        let ld = DownloadOption::ld();
        assert_eq!(ld.resolution.as_deref(), Some("360p"));

        let audio = DownloadOption::audio();
        assert_eq!(audio.kind, StreamKind::Audio);
        assert!(!audio.progressive);
        assert_eq!(audio.abr.as_deref(), Some("128kbps"));
    }

    #[test]
    fn test_option_labels() {
        assert_eq!(DownloadOption::hd().label(), "720p");
        assert_eq!(DownloadOption::ld().label(), "360p");
        assert_eq!(DownloadOption::audio().label(), "audio");
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::Unavailable("720p".to_string());
        assert!(err.to_string().contains("unavailable"));
        assert_eq!(
            AppError::MissingFolder.to_string(),
            "Please select a download directory"
        );
    }
}
