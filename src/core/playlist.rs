//! Playlist download session
//!
//! Fetches the playlist and the metadata of every entry up front, so
//! option availability can be decided before any bytes move: an option is
//! offered only when every video in the playlist has a matching stream.
//! Videos are downloaded sequentially into a directory named after the
//! playlist.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::core::downloader::HttpDownloader;
use crate::core::models::{
    AppError, AppResult, DownloadOption, PlaylistInfo, PlaylistProgress, VideoInfo,
};
use crate::core::retry::RetryPolicy;
use crate::core::selection;
use crate::core::source::VideoSource;
use crate::core::video::VideoDownloader;
use crate::utils::fs::{ensure_dir_exists, sanitize_filename, unique_path};

/// Download session for a whole playlist
pub struct PlaylistDownloader {
    playlist: PlaylistInfo,
    videos: Vec<VideoInfo>,
    downloader: Arc<HttpDownloader>,
    retry: RetryPolicy,
}

impl PlaylistDownloader {
    /// Fetch the playlist and every entry's metadata
    pub async fn new(
        source: &dyn VideoSource,
        url: &str,
        downloader: Arc<HttpDownloader>,
        retry: RetryPolicy,
    ) -> AppResult<Self> {
        let playlist = source.fetch_playlist(url).await?;

        let mut videos = Vec::with_capacity(playlist.video_count());
        for entry in &playlist.entries {
            match source.fetch_video(&entry.url).await {
                Ok(video) => videos.push(video),
                Err(e) => {
                    // Deleted or private entries are skipped, not fatal
                    warn!("Skipping playlist entry \"{}\": {}", entry.title, e);
                }
            }
        }

        Ok(Self {
            playlist,
            videos,
            downloader,
            retry,
        })
    }

    pub fn playlist(&self) -> &PlaylistInfo {
        &self.playlist
    }

    pub fn videos(&self) -> &[VideoInfo] {
        &self.videos
    }

    /// Whether every video of the playlist can serve this option
    pub fn is_available(&self, option: &DownloadOption) -> bool {
        !self.videos.is_empty() && selection::playlist_streams(&self.videos, option).is_some()
    }

    /// Total size label for an option, e.g. "123.4 MB" or "Unavailable"
    pub fn size_label(&self, option: &DownloadOption) -> String {
        selection::playlist_size_label(&self.videos, option)
    }

    /// Download every video of the playlist with the given option.
    ///
    /// Creates a directory named after the playlist inside `folder` and
    /// returns its path. Progress is reported per completed item.
    pub async fn download_all(
        &self,
        option: &DownloadOption,
        folder: &Path,
        cancel: Arc<AtomicBool>,
        progress: Option<UnboundedSender<PlaylistProgress>>,
    ) -> AppResult<PathBuf> {
        if !self.is_available(option) {
            return Err(AppError::Unavailable(option.label()));
        }
        if folder.as_os_str().is_empty() {
            return Err(AppError::MissingFolder);
        }
        ensure_dir_exists(folder).map_err(|e| AppError::Download(e.to_string()))?;

        let dir = unique_path(&folder.join(sanitize_filename(&self.playlist.title)));
        ensure_dir_exists(&dir).map_err(|e| AppError::Download(e.to_string()))?;

        info!(
            "Downloading playlist \"{}\" ({} videos) to {}",
            self.playlist.title,
            self.videos.len(),
            dir.display()
        );

        let total = self.videos.len();
        for (index, video) in self.videos.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                return Err(AppError::Cancelled);
            }

            let session = VideoDownloader::from_info(
                video.clone(),
                Arc::clone(&self.downloader),
                self.retry.clone(),
            );
            session
                .download(option, &dir, Arc::clone(&cancel), None)
                .await?;

            if let Some(sender) = &progress {
                let _ = sender.send(PlaylistProgress {
                    completed: index + 1,
                    total,
                    current_title: video.title.clone(),
                });
            }
        }

        info!("Playlist \"{}\" completed", self.playlist.title);
        Ok(dir)
    }
}
