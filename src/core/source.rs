//! Metadata backend for YouTube videos and playlists
//!
//! The [`VideoSource`] trait abstracts over how metadata and stream lists
//! are obtained, so sessions and the manager can be tested without the
//! network. The production implementation shells out to the `yt-dlp`
//! binary and parses its JSON output into the core models.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

use crate::core::models::{
    AppError, AppResult, PlaylistEntry, PlaylistInfo, StreamInfo, StreamKind, VideoInfo,
};
use crate::utils::url::is_youtube_url;

/// Provider of video and playlist metadata
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Fetch metadata and available streams for a single video
    async fn fetch_video(&self, url: &str) -> AppResult<VideoInfo>;

    /// Fetch playlist metadata and its entries (without stream lists)
    async fn fetch_playlist(&self, url: &str) -> AppResult<PlaylistInfo>;
}

/// `yt-dlp` subprocess backend
pub struct YtDlpSource {
    binary: PathBuf,
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpSource {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
        }
    }

    /// Use a specific yt-dlp binary instead of resolving from PATH
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> AppResult<String> {
        debug!("Running {} {:?}", self.binary.display(), args);

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                AppError::Metadata(format!(
                    "Failed to launch {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Metadata(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl VideoSource for YtDlpSource {
    async fn fetch_video(&self, url: &str) -> AppResult<VideoInfo> {
        if !is_youtube_url(url) {
            return Err(AppError::UnsupportedUrl(url.to_string()));
        }

        let json = self
            .run(&["--dump-json", "--no-playlist", "--no-download", url])
            .await?;
        let info = parse_video_json(&json)?;

        info!("Fetched video info: {}", info.title);
        Ok(info)
    }

    async fn fetch_playlist(&self, url: &str) -> AppResult<PlaylistInfo> {
        if !is_youtube_url(url) {
            return Err(AppError::UnsupportedUrl(url.to_string()));
        }

        let json = self
            .run(&[
                "--dump-single-json",
                "--flat-playlist",
                "--yes-playlist",
                url,
            ])
            .await?;
        let info = parse_playlist_json(&json)?;

        info!(
            "Fetched playlist info: {} ({} videos)",
            info.title,
            info.video_count()
        );
        Ok(info)
    }
}

// yt-dlp JSON shapes, reduced to the fields the models need

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: String,
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    abr: Option<f64>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVideo {
    id: String,
    title: String,
    description: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel_url: Option<String>,
    uploader_url: Option<String>,
    view_count: Option<u64>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: Option<String>,
    url: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlaylist {
    title: Option<String>,
    uploader: Option<String>,
    uploader_url: Option<String>,
    view_count: Option<u64>,
    modified_date: Option<String>,
    webpage_url: Option<String>,
    #[serde(default)]
    entries: Vec<RawEntry>,
}

fn codec_present(codec: &Option<String>) -> bool {
    matches!(codec.as_deref(), Some(c) if !c.is_empty() && c != "none")
}

fn convert_format(raw: RawFormat) -> Option<StreamInfo> {
    let has_video = codec_present(&raw.vcodec);
    let has_audio = codec_present(&raw.acodec);

    let kind = if has_video {
        StreamKind::Video
    } else if has_audio {
        StreamKind::Audio
    } else {
        // Storyboards and other non-media formats
        return None;
    };

    let filesize = raw
        .filesize
        .or(raw.filesize_approx)
        .filter(|size| *size > 0.0)
        .map(|size| size as u64);

    Some(StreamInfo {
        format_id: raw.format_id,
        ext: raw.ext.unwrap_or_else(|| "mp4".to_string()),
        kind,
        resolution: raw.height.map(|h| format!("{h}p")),
        abr: raw.abr.filter(|abr| *abr > 0.0).map(|abr| {
            format!("{}kbps", abr.round() as u64)
        }),
        progressive: has_video && has_audio,
        filesize,
        url: raw.url,
    })
}

/// Parse `yt-dlp --dump-json` output for a single video
pub fn parse_video_json(json: &str) -> AppResult<VideoInfo> {
    let raw: RawVideo = serde_json::from_str(json)
        .map_err(|e| AppError::Metadata(format!("Failed to parse video metadata: {e}")))?;

    let url = raw
        .webpage_url
        .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", raw.id));

    Ok(VideoInfo {
        id: raw.id,
        url,
        title: raw.title,
        author: raw.uploader,
        channel_url: raw.channel_url.or(raw.uploader_url),
        duration_seconds: raw.duration.map(|d| d as u64).unwrap_or(0),
        views: raw.view_count,
        thumbnail_url: raw.thumbnail,
        description: raw.description,
        streams: raw.formats.into_iter().filter_map(convert_format).collect(),
    })
}

/// Parse `yt-dlp --dump-single-json --flat-playlist` output
pub fn parse_playlist_json(json: &str) -> AppResult<PlaylistInfo> {
    let raw: RawPlaylist = serde_json::from_str(json)
        .map_err(|e| AppError::Metadata(format!("Failed to parse playlist metadata: {e}")))?;

    let entries = raw
        .entries
        .into_iter()
        .filter_map(|entry| {
            let id = entry.id?;
            let url = entry
                .url
                .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={id}"));
            let title = entry.title.unwrap_or_else(|| id.clone());
            Some(PlaylistEntry { id, url, title })
        })
        .collect();

    Ok(PlaylistInfo {
        url: raw.webpage_url.unwrap_or_default(),
        title: raw.title.unwrap_or_else(|| "Playlist".to_string()),
        owner: raw.uploader,
        owner_url: raw.uploader_url,
        views: raw.view_count,
        last_updated: raw.modified_date,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::DownloadOption;
    use crate::core::selection;

    const VIDEO_JSON: &str = r#"{
        "id": "dQw4w9WgXcQ",
        "title": "Test Video",
        "description": "A description",
        "duration": 212.5,
        "uploader": "Test Channel",
        "channel_url": "https://www.youtube.com/channel/UC123",
        "view_count": 1000000,
        "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq720.jpg",
        "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "formats": [
            {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none"},
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2",
             "abr": 128.04, "filesize": 3400000, "url": "https://media.example/140"},
            {"format_id": "18", "ext": "mp4", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2",
             "height": 360, "filesize": 11000000, "url": "https://media.example/18"},
            {"format_id": "22", "ext": "mp4", "vcodec": "avc1.64001F", "acodec": "mp4a.40.2",
             "height": 720, "filesize_approx": 52000000.0, "url": "https://media.example/22"},
            {"format_id": "247", "ext": "webm", "vcodec": "vp9", "acodec": "none",
             "height": 720, "filesize": 30000000, "url": "https://media.example/247"}
        ]
    }"#;

    const PLAYLIST_JSON: &str = r#"{
        "title": "Test Playlist",
        "uploader": "Playlist Owner",
        "uploader_url": "https://www.youtube.com/@owner",
        "view_count": 4200,
        "modified_date": "20240101",
        "webpage_url": "https://www.youtube.com/playlist?list=PL123",
        "entries": [
            {"id": "aaaaaaaaaaa", "url": "https://www.youtube.com/watch?v=aaaaaaaaaaa", "title": "First"},
            {"id": "bbbbbbbbbbb", "title": "Second"},
            {"id": null, "title": "Broken entry"}
        ]
    }"#;

    #[test]
    fn test_parse_video_json() {
        let video = parse_video_json(VIDEO_JSON).unwrap();
        assert_eq!(video.id, "dQw4w9WgXcQ");
        assert_eq!(video.title, "Test Video");
        assert_eq!(video.author.as_deref(), Some("Test Channel"));
        assert_eq!(video.duration_seconds, 212);
        assert_eq!(video.views, Some(1000000));
        // Storyboard format is dropped
        assert_eq!(video.streams.len(), 4);
    }

    #[test]
    fn test_parse_video_stream_mapping() {
        let video = parse_video_json(VIDEO_JSON).unwrap();

        let audio = video
            .streams
            .iter()
            .find(|s| s.format_id == "140")
            .unwrap();
        assert_eq!(audio.kind, StreamKind::Audio);
        assert_eq!(audio.abr.as_deref(), Some("128kbps"));
        assert!(!audio.progressive);

        let progressive = video.streams.iter().find(|s| s.format_id == "22").unwrap();
        assert_eq!(progressive.kind, StreamKind::Video);
        assert_eq!(progressive.resolution.as_deref(), Some("720p"));
        assert!(progressive.progressive);
        assert_eq!(progressive.filesize, Some(52000000));

        let adaptive = video.streams.iter().find(|s| s.format_id == "247").unwrap();
        assert!(!adaptive.progressive);
    }

    #[test]
    fn test_parsed_streams_satisfy_download_options() {
        let video = parse_video_json(VIDEO_JSON).unwrap();

        let hd = selection::select_stream(&video.streams, &DownloadOption::hd()).unwrap();
        assert_eq!(hd.format_id, "22");

        let ld = selection::select_stream(&video.streams, &DownloadOption::ld()).unwrap();
        assert_eq!(ld.format_id, "18");

        let audio = selection::select_stream(&video.streams, &DownloadOption::audio()).unwrap();
        assert_eq!(audio.format_id, "140");
    }

    #[test]
    fn test_parse_playlist_json() {
        let playlist = parse_playlist_json(PLAYLIST_JSON).unwrap();
        assert_eq!(playlist.title, "Test Playlist");
        assert_eq!(playlist.owner.as_deref(), Some("Playlist Owner"));
        assert_eq!(playlist.views, Some(4200));
        assert_eq!(playlist.last_updated.as_deref(), Some("20240101"));
        // Entry without an id is dropped
        assert_eq!(playlist.video_count(), 2);
        assert_eq!(
            playlist.entries[1].url,
            "https://www.youtube.com/watch?v=bbbbbbbbbbb"
        );
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_video_json("not json").is_err());
        assert!(parse_playlist_json("[1, 2]").is_err());
    }

    #[tokio::test]
    async fn test_source_rejects_foreign_urls() {
        let source = YtDlpSource::new();
        let result = source.fetch_video("https://example.com/video").await;
        assert!(matches!(result, Err(AppError::UnsupportedUrl(_))));

        let result = source.fetch_playlist("https://example.com/playlist").await;
        assert!(matches!(result, Err(AppError::UnsupportedUrl(_))));
    }
}
