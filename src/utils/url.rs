//! YouTube URL validation and classification

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::core::models::{AppError, AppResult};

/// Kind of YouTube URL a request refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Video,
    Playlist,
}

const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid video id regex"))
}

/// Validate if URL points at YouTube
pub fn is_youtube_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.to_ascii_lowercase()))
        .map(|host| YOUTUBE_HOSTS.contains(&host.as_str()))
        .unwrap_or(false)
}

/// Classify a YouTube URL as a single video or a playlist
pub fn classify(url: &str) -> AppResult<UrlKind> {
    let parsed =
        Url::parse(url).map_err(|_| AppError::UnsupportedUrl(url.to_string()))?;
    let host = parsed
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .unwrap_or_default();

    if !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return Err(AppError::UnsupportedUrl(url.to_string()));
    }

    if host == "youtu.be" {
        return if parsed.path().len() > 1 {
            Ok(UrlKind::Video)
        } else {
            Err(AppError::UnsupportedUrl(url.to_string()))
        };
    }

    let path = parsed.path();
    if path.starts_with("/playlist") {
        return Ok(UrlKind::Playlist);
    }
    if path.starts_with("/watch") {
        let has_video = parsed.query_pairs().any(|(k, _)| k == "v");
        return if has_video {
            Ok(UrlKind::Video)
        } else {
            Err(AppError::UnsupportedUrl(url.to_string()))
        };
    }
    if path.starts_with("/shorts/") || path.starts_with("/embed/") {
        return Ok(UrlKind::Video);
    }
    // A bare list parameter without a watch path still names a playlist
    if parsed.query_pairs().any(|(k, _)| k == "list") {
        return Ok(UrlKind::Playlist);
    }

    Err(AppError::UnsupportedUrl(url.to_string()))
}

/// Extract the 11-character video id from a YouTube URL
pub fn video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();

    let candidate = if host == "youtu.be" {
        parsed.path_segments()?.next().map(|s| s.to_string())
    } else if parsed.path().starts_with("/watch") {
        parsed
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
    } else if parsed.path().starts_with("/shorts/") || parsed.path().starts_with("/embed/") {
        parsed.path_segments()?.nth(1).map(|s| s.to_string())
    } else {
        None
    }?;

    if video_id_regex().is_match(&candidate) {
        Some(candidate)
    } else {
        None
    }
}
