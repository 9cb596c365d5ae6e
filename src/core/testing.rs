//! Test fixtures shared across the core test modules

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::downloader::{DownloaderConfig, HttpDownloader};
use crate::core::models::{
    AppError, AppResult, PlaylistEntry, PlaylistInfo, StreamInfo, StreamKind, VideoInfo,
};
use crate::core::source::VideoSource;

/// In-memory source serving canned videos and one optional playlist
pub(crate) struct MockSource {
    pub videos: Vec<VideoInfo>,
    pub playlist: Option<PlaylistInfo>,
}

#[async_trait]
impl VideoSource for MockSource {
    async fn fetch_video(&self, url: &str) -> AppResult<VideoInfo> {
        self.videos
            .iter()
            .find(|v| v.url == url)
            .cloned()
            .ok_or_else(|| AppError::Metadata(format!("unknown video: {url}")))
    }

    async fn fetch_playlist(&self, _url: &str) -> AppResult<PlaylistInfo> {
        self.playlist
            .clone()
            .ok_or_else(|| AppError::Metadata("no playlist".to_string()))
    }
}

pub(crate) fn test_video(id: &str, title: &str, streams: Vec<StreamInfo>) -> VideoInfo {
    VideoInfo {
        id: id.to_string(),
        url: format!("https://www.youtube.com/watch?v={id}"),
        title: title.to_string(),
        author: Some("Channel".to_string()),
        channel_url: None,
        duration_seconds: 120,
        views: Some(42),
        thumbnail_url: None,
        description: None,
        streams,
    }
}

pub(crate) fn hd_stream(url: Option<&str>) -> StreamInfo {
    StreamInfo {
        format_id: "22".to_string(),
        ext: "mp4".to_string(),
        kind: StreamKind::Video,
        resolution: Some("720p".to_string()),
        abr: None,
        progressive: true,
        filesize: Some(1_048_576),
        url: url.map(|u| u.to_string()),
    }
}

pub(crate) fn test_playlist(title: &str, entries: &[(&str, &str)]) -> PlaylistInfo {
    PlaylistInfo {
        url: "https://www.youtube.com/playlist?list=PLtest".to_string(),
        title: title.to_string(),
        owner: Some("Owner".to_string()),
        owner_url: None,
        views: Some(100),
        last_updated: None,
        entries: entries
            .iter()
            .map(|(id, title)| PlaylistEntry {
                id: id.to_string(),
                url: format!("https://www.youtube.com/watch?v={id}"),
                title: title.to_string(),
            })
            .collect(),
    }
}

pub(crate) fn test_downloader() -> Arc<HttpDownloader> {
    Arc::new(HttpDownloader::new(&DownloaderConfig::default()).unwrap())
}

/// Serve one HTTP 200 response with the given body on a random local port
pub(crate) async fn serve_bytes(body: Vec<u8>) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
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

    format!("http://{}/media", addr)
}
