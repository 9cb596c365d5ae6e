//! High-level operations behind the command line
//!
//! Each function takes a metadata source plus plain parameters and
//! returns serializable results, keeping the terminal frontend thin.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::downloader::HttpDownloader;
use crate::core::models::{
    AppResult, DownloadOption, PlaylistProgress, ProgressUpdate,
};
use crate::core::playlist::PlaylistDownloader;
use crate::core::retry::RetryPolicy;
use crate::core::source::VideoSource;
use crate::core::video::VideoDownloader;
use crate::utils::url::{classify, UrlKind};

/// Size label of one download option
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionReport {
    pub quality: String,
    pub available: bool,
    pub size: String,
}

/// Inspection result for a single video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSummary {
    pub id: String,
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub channel_url: Option<String>,
    pub duration_seconds: u64,
    pub views: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub options: Vec<OptionReport>,
}

/// Inspection result for a playlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub url: String,
    pub title: String,
    pub owner: Option<String>,
    pub owner_url: Option<String>,
    pub video_count: usize,
    pub views: Option<u64>,
    pub last_updated: Option<String>,
    pub options: Vec<OptionReport>,
}

/// Either kind of inspection result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfoSummary {
    Video(VideoSummary),
    Playlist(PlaylistSummary),
}

/// Result of a completed download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    /// "video" or "playlist"
    pub kind: String,
    /// Number of files written
    pub items: usize,
}

fn standard_options() -> [(&'static str, DownloadOption); 3] {
    [
        ("hd", DownloadOption::hd()),
        ("ld", DownloadOption::ld()),
        ("audio", DownloadOption::audio()),
    ]
}

/// Fetch metadata for a URL and report per-option availability and size
pub async fn info(
    source: &dyn VideoSource,
    downloader: Arc<HttpDownloader>,
    url: &str,
) -> AppResult<InfoSummary> {
    match classify(url)? {
        UrlKind::Video => {
            let session =
                VideoDownloader::new(source, url, downloader, RetryPolicy::default()).await?;
            let info = session.info();

            let options = standard_options()
                .into_iter()
                .map(|(quality, option)| OptionReport {
                    quality: quality.to_string(),
                    available: session.stream_for(&option).is_some(),
                    size: session.size_label(&option),
                })
                .collect();

            Ok(InfoSummary::Video(VideoSummary {
                id: info.id.clone(),
                url: info.url.clone(),
                title: info.title.clone(),
                author: info.author.clone(),
                channel_url: info.channel_url.clone(),
                duration_seconds: info.duration_seconds,
                views: info.views,
                thumbnail_url: info.thumbnail_url.clone(),
                description: info.description.clone(),
                options,
            }))
        }
        UrlKind::Playlist => {
            let session =
                PlaylistDownloader::new(source, url, downloader, RetryPolicy::default()).await?;
            let playlist = session.playlist();

            let options = standard_options()
                .into_iter()
                .map(|(quality, option)| OptionReport {
                    quality: quality.to_string(),
                    available: session.is_available(&option),
                    size: session.size_label(&option),
                })
                .collect();

            Ok(InfoSummary::Playlist(PlaylistSummary {
                url: playlist.url.clone(),
                title: playlist.title.clone(),
                owner: playlist.owner.clone(),
                owner_url: playlist.owner_url.clone(),
                video_count: playlist.video_count(),
                views: playlist.views,
                last_updated: playlist.last_updated.clone(),
                options,
            }))
        }
    }
}

/// Download a video or playlist URL into `folder`
#[allow(clippy::too_many_arguments)]
pub async fn download(
    source: &dyn VideoSource,
    downloader: Arc<HttpDownloader>,
    retry: RetryPolicy,
    url: &str,
    option: &DownloadOption,
    folder: &Path,
    cancel: Arc<AtomicBool>,
    video_progress: Option<UnboundedSender<ProgressUpdate>>,
    playlist_progress: Option<UnboundedSender<PlaylistProgress>>,
) -> AppResult<DownloadOutcome> {
    match classify(url)? {
        UrlKind::Video => {
            let session = VideoDownloader::new(source, url, downloader, retry).await?;
            let path = session
                .download(option, folder, cancel, video_progress)
                .await?;
            Ok(DownloadOutcome {
                path,
                kind: "video".to_string(),
                items: 1,
            })
        }
        UrlKind::Playlist => {
            let session = PlaylistDownloader::new(source, url, downloader, retry).await?;
            let items = session.videos().len();
            let path = session
                .download_all(option, folder, cancel, playlist_progress)
                .await?;
            Ok(DownloadOutcome {
                path,
                kind: "playlist".to_string(),
                items,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{
        hd_stream, serve_bytes, test_downloader, test_playlist, test_video, MockSource,
    };
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_info_for_video_reports_option_availability() {
        let source = MockSource {
            videos: vec![test_video("aaaaaaaaaaa", "Clip", vec![hd_stream(None)])],
            playlist: None,
        };

        let summary = info(
            &source,
            test_downloader(),
            "https://www.youtube.com/watch?v=aaaaaaaaaaa",
        )
        .await
        .unwrap();

        let InfoSummary::Video(video) = summary else {
            panic!("expected video summary");
        };
        assert_eq!(video.title, "Clip");
        assert_eq!(video.url, "https://www.youtube.com/watch?v=aaaaaaaaaaa");
        assert_eq!(video.author.as_deref(), Some("Channel"));

        let hd = video.options.iter().find(|o| o.quality == "hd").unwrap();
        assert!(hd.available);
        assert_eq!(hd.size, "1.0 MB");

        let audio = video.options.iter().find(|o| o.quality == "audio").unwrap();
        assert!(!audio.available);
        assert_eq!(audio.size, "Unavailable");
    }

    #[tokio::test]
    async fn test_info_for_playlist() {
        let source = MockSource {
            videos: vec![
                test_video("aaaaaaaaaaa", "First", vec![hd_stream(None)]),
                test_video("bbbbbbbbbbb", "Second", vec![hd_stream(None)]),
            ],
            playlist: Some(test_playlist(
                "Mix",
                &[("aaaaaaaaaaa", "First"), ("bbbbbbbbbbb", "Second")],
            )),
        };

        let summary = info(
            &source,
            test_downloader(),
            "https://www.youtube.com/playlist?list=PLtest",
        )
        .await
        .unwrap();

        let InfoSummary::Playlist(playlist) = summary else {
            panic!("expected playlist summary");
        };
        assert_eq!(playlist.title, "Mix");
        assert_eq!(playlist.url, "https://www.youtube.com/playlist?list=PLtest");
        assert_eq!(playlist.owner.as_deref(), Some("Owner"));
        assert_eq!(playlist.video_count, 2);
        let hd = playlist.options.iter().find(|o| o.quality == "hd").unwrap();
        assert!(hd.available);
        assert_eq!(hd.size, "2.0 MB");
    }

    #[tokio::test]
    async fn test_download_dispatches_on_url_kind() {
        let media_url = serve_bytes(b"clip".to_vec()).await;
        let source = MockSource {
            videos: vec![test_video(
                "aaaaaaaaaaa",
                "Clip",
                vec![hd_stream(Some(&media_url))],
            )],
            playlist: None,
        };

        let dir = tempdir().unwrap();
        let outcome = download(
            &source,
            test_downloader(),
            RetryPolicy::default(),
            "https://www.youtube.com/watch?v=aaaaaaaaaaa",
            &DownloadOption::hd(),
            dir.path(),
            Arc::new(AtomicBool::new(false)),
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.kind, "video");
        assert_eq!(outcome.items, 1);
        assert!(outcome.path.is_file());
    }
}
