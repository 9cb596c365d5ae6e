//! Single-video download session
//!
//! Fetches metadata through a [`VideoSource`], binds a download option to
//! a concrete stream and streams it to disk under a sanitized file name.
//! Collisions with existing files get a numeric suffix instead of being
//! overwritten.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::core::downloader::HttpDownloader;
use crate::core::models::{
    AppError, AppResult, DownloadOption, ProgressUpdate, StreamInfo, VideoInfo,
};
use crate::core::retry::{run_with_retry, RetryPolicy};
use crate::core::selection;
use crate::utils::fs::{ensure_dir_exists, sanitize_filename, unique_path};

/// Download session for one video
pub struct VideoDownloader {
    info: VideoInfo,
    downloader: Arc<HttpDownloader>,
    retry: RetryPolicy,
}

impl VideoDownloader {
    /// Fetch the video's metadata and build a session for it
    pub async fn new(
        source: &dyn crate::core::source::VideoSource,
        url: &str,
        downloader: Arc<HttpDownloader>,
        retry: RetryPolicy,
    ) -> AppResult<Self> {
        let info = source.fetch_video(url).await?;
        Ok(Self::from_info(info, downloader, retry))
    }

    /// Build a session from already-fetched metadata
    pub fn from_info(info: VideoInfo, downloader: Arc<HttpDownloader>, retry: RetryPolicy) -> Self {
        Self {
            info,
            downloader,
            retry,
        }
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Stream the option resolves to, if any
    pub fn stream_for(&self, option: &DownloadOption) -> Option<&StreamInfo> {
        selection::select_stream(&self.info.streams, option)
    }

    /// Size label for an option, e.g. "12.3 MB" or "Unavailable"
    pub fn size_label(&self, option: &DownloadOption) -> String {
        selection::video_size_label(&self.info, option)
    }

    /// Download the stream selected by `option` into `folder`.
    ///
    /// Returns the path of the written file. Progress updates carry the
    /// video id as task id; the manager rewrites it for tracked tasks.
    pub async fn download(
        &self,
        option: &DownloadOption,
        folder: &Path,
        cancel: Arc<AtomicBool>,
        progress: Option<UnboundedSender<ProgressUpdate>>,
    ) -> AppResult<PathBuf> {
        let stream = self
            .stream_for(option)
            .ok_or_else(|| AppError::Unavailable(option.label()))?;

        if folder.as_os_str().is_empty() {
            return Err(AppError::MissingFolder);
        }
        ensure_dir_exists(folder).map_err(|e| AppError::Download(e.to_string()))?;

        let media_url = stream
            .url
            .clone()
            .ok_or_else(|| AppError::Metadata(format!(
                "No media URL for format {}",
                stream.format_id
            )))?;

        let filename = format!("{}.mp4", sanitize_filename(&self.info.title));
        let dest = unique_path(&folder.join(filename));

        info!(
            "Downloading \"{}\" ({}) to {}",
            self.info.title,
            option.label(),
            dest.display()
        );

        let downloader = Arc::clone(&self.downloader);
        let task_id = self.info.id.clone();

        run_with_retry(&self.retry, move |_attempt| {
            let downloader = Arc::clone(&downloader);
            let media_url = media_url.clone();
            let dest = dest.clone();
            let cancel = Arc::clone(&cancel);
            let progress = progress.clone();
            let task_id = task_id.clone();

            async move {
                downloader
                    .download_to_file(&media_url, &dest, &cancel, |snapshot| {
                        if let Some(sender) = &progress {
                            let _ = sender.send(ProgressUpdate {
                                task_id: task_id.clone(),
                                downloaded_bytes: snapshot.downloaded_bytes,
                                total_bytes: snapshot.total_bytes,
                                percent: snapshot.percent,
                                speed: snapshot.smoothed_speed,
                                eta_seconds: snapshot.eta_seconds,
                            });
                        }
                    })
                    .await?;
                Ok(dest)
            }
        })
        .await
    }
}
