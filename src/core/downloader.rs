//! Streaming HTTP download engine
//!
//! Wraps a shared `reqwest` client and streams response bodies to disk in
//! chunks, reporting progress through a callback and honouring a shared
//! cancellation flag. Cancellation removes the partial file.

use futures_util::StreamExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::core::models::{AppError, AppResult, DownloadConfig};
use crate::core::progress::{ProgressSnapshot, TaskProgress};

/// Settings for the HTTP client
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        let defaults = DownloadConfig::default();
        Self {
            timeout: Duration::from_secs(defaults.timeout_seconds),
            user_agent: defaults.user_agent,
        }
    }
}

impl From<&DownloadConfig> for DownloaderConfig {
    fn from(config: &DownloadConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_seconds),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// HTTP downloader with a reusable client
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(config: &DownloaderConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client })
    }

    /// Stream `url` into `dest`, creating parent directories as needed.
    ///
    /// `on_progress` is invoked after every chunk. Returns the number of
    /// bytes written. When `cancel` becomes true mid-transfer the partial
    /// file is deleted and `AppError::Cancelled` is returned.
    pub async fn download_to_file<F>(
        &self,
        url: &str,
        dest: &Path,
        cancel: &AtomicBool,
        mut on_progress: F,
    ) -> AppResult<u64>
    where
        F: FnMut(ProgressSnapshot),
    {
        if cancel.load(Ordering::Relaxed) {
            return Err(AppError::Cancelled);
        }

        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Download(format!(
                "Server returned {} for {}",
                response.status(),
                url
            )));
        }

        let total_bytes = response.content_length();
        let mut tracker = TaskProgress::new(total_bytes);

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            if cancel.load(Ordering::Relaxed) {
                drop(file);
                if let Err(e) = tokio::fs::remove_file(dest).await {
                    warn!("Failed to remove partial file {}: {}", dest.display(), e);
                }
                info!("Download cancelled: {}", dest.display());
                return Err(AppError::Cancelled);
            }

            let chunk = chunk.map_err(AppError::Network)?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            on_progress(tracker.update(downloaded));
        }

        file.flush().await?;
        info!("Downloaded {} bytes to {}", downloaded, dest.display());
        Ok(downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one HTTP response with the given body, then close
    async fn one_shot_server(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;

            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(header.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.flush().await.unwrap();
        });

        format!("http://{}/video.mp4", addr)
    }

    #[tokio::test]
    async fn test_download_writes_file_and_reports_progress() {
        let body = vec![7u8; 64 * 1024];
        let url = one_shot_server(body.clone()).await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("video.mp4");
        let downloader = HttpDownloader::new(&DownloaderConfig::default()).unwrap();

        let cancel = AtomicBool::new(false);
        let mut snapshots = Vec::new();
        let written = downloader
            .download_to_file(&url, &dest, &cancel, |s| snapshots.push(s))
            .await
            .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), body);

        assert!(!snapshots.is_empty());
        let last = snapshots.last().unwrap();
        assert_eq!(last.downloaded_bytes, body.len() as u64);
        assert!((last.percent - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_download_creates_parent_directories() {
        let url = one_shot_server(b"data".to_vec()).await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("nested").join("deep").join("video.mp4");
        let downloader = HttpDownloader::new(&DownloaderConfig::default()).unwrap();

        let cancel = AtomicBool::new(false);
        downloader
            .download_to_file(&url, &dest, &cancel, |_| {})
            .await
            .unwrap();
        assert!(dest.is_file());
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("video.mp4");
        let downloader = HttpDownloader::new(&DownloaderConfig::default()).unwrap();

        let cancel = AtomicBool::new(true);
        let result = downloader
            .download_to_file("http://127.0.0.1:1/never", &dest, &cancel, |_| {})
            .await;

        assert!(matches!(result, Err(AppError::Cancelled)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_cancel_mid_transfer_removes_partial_file() {
        // Body arrives in two halves with a pause in between
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;

            let header =
                "HTTP/1.1 200 OK\r\nContent-Length: 16384\r\nConnection: close\r\n\r\n";
            socket.write_all(header.as_bytes()).await.unwrap();
            socket.write_all(&[1u8; 8192]).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = socket.write_all(&[2u8; 8192]).await;
        });

        let dir = tempdir().unwrap();
        let dest = dir.path().join("video.mp4");
        let downloader = HttpDownloader::new(&DownloaderConfig::default()).unwrap();

        let cancel = AtomicBool::new(false);
        let result = downloader
            .download_to_file(
                &format!("http://{}/video.mp4", addr),
                &dest,
                &cancel,
                |snapshot| {
                    if snapshot.downloaded_bytes > 0 {
                        cancel.store(true, Ordering::Relaxed);
                    }
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Cancelled)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_http_error_status_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
        });

        let dir = tempdir().unwrap();
        let dest = dir.path().join("video.mp4");
        let downloader = HttpDownloader::new(&DownloaderConfig::default()).unwrap();

        let cancel = AtomicBool::new(false);
        let result = downloader
            .download_to_file(&format!("http://{}/missing", addr), &dest, &cancel, |_| {})
            .await;

        assert!(matches!(result, Err(AppError::Download(_))));
        assert!(!dest.exists());
    }
}
