//! Stream selection logic
//!
//! Binds download options (720p / 360p / audio) to concrete streams of a
//! video, and decides option availability and total size for playlists.
//! A playlist option is only considered available when every video in the
//! playlist has a matching stream.

use crate::core::models::{DownloadOption, StreamInfo, VideoInfo};
use crate::utils::fs::format_size;

/// Check whether a stream satisfies a download option
pub fn matches(stream: &StreamInfo, option: &DownloadOption) -> bool {
    if stream.kind != option.kind || stream.progressive != option.progressive {
        return false;
    }
    if let Some(resolution) = &option.resolution {
        if stream.resolution.as_deref() != Some(resolution.as_str()) {
            return false;
        }
    }
    if let Some(abr) = &option.abr {
        if stream.abr.as_deref() != Some(abr.as_str()) {
            return false;
        }
    }
    true
}

/// Select the first stream matching the option
pub fn select_stream<'a>(
    streams: &'a [StreamInfo],
    option: &DownloadOption,
) -> Option<&'a StreamInfo> {
    streams.iter().find(|stream| matches(stream, option))
}

/// Size in bytes of the stream a video option resolves to
pub fn video_size(video: &VideoInfo, option: &DownloadOption) -> Option<u64> {
    select_stream(&video.streams, option).and_then(|stream| stream.filesize)
}

/// Human-readable size of a video option, or "Unavailable"
pub fn video_size_label(video: &VideoInfo, option: &DownloadOption) -> String {
    match select_stream(&video.streams, option) {
        Some(stream) => format_size(stream.filesize.unwrap_or(0)),
        None => "Unavailable".to_string(),
    }
}

/// Resolve an option against every video of a playlist.
///
/// Returns `None` unless all videos have a matching stream.
pub fn playlist_streams<'a>(
    videos: &'a [VideoInfo],
    option: &DownloadOption,
) -> Option<Vec<&'a StreamInfo>> {
    let selected: Vec<&StreamInfo> = videos
        .iter()
        .filter_map(|video| select_stream(&video.streams, option))
        .collect();

    if selected.len() == videos.len() {
        Some(selected)
    } else {
        None
    }
}

/// Total size in bytes of a playlist option, when available.
///
/// Streams with unknown size contribute zero bytes.
pub fn playlist_size(videos: &[VideoInfo], option: &DownloadOption) -> Option<u64> {
    playlist_streams(videos, option)
        .map(|streams| streams.iter().filter_map(|stream| stream.filesize).sum())
}

/// Human-readable total size of a playlist option, or "Unavailable"
pub fn playlist_size_label(videos: &[VideoInfo], option: &DownloadOption) -> String {
    match playlist_size(videos, option) {
        Some(bytes) => format_size(bytes),
        None => "Unavailable".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::StreamKind;

    fn video_stream(format_id: &str, resolution: &str, filesize: Option<u64>) -> StreamInfo {
        StreamInfo {
            format_id: format_id.to_string(),
            ext: "mp4".to_string(),
            kind: StreamKind::Video,
            resolution: Some(resolution.to_string()),
            abr: None,
            progressive: true,
            filesize,
            url: Some(format!("https://media.example/{format_id}")),
        }
    }

    fn audio_stream(format_id: &str, abr: &str, filesize: Option<u64>) -> StreamInfo {
        StreamInfo {
            format_id: format_id.to_string(),
            ext: "mp4".to_string(),
            kind: StreamKind::Audio,
            resolution: None,
            abr: Some(abr.to_string()),
            progressive: false,
            filesize,
            url: Some(format!("https://media.example/{format_id}")),
        }
    }

    fn video_with(streams: Vec<StreamInfo>) -> VideoInfo {
        VideoInfo {
            id: "dQw4w9WgXcQ".to_string(),
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            title: "Test Video".to_string(),
            author: None,
            channel_url: None,
            duration_seconds: 60,
            views: None,
            thumbnail_url: None,
            description: None,
            streams,
        }
    }

    #[test]
    fn test_select_stream_by_resolution() {
        let streams = vec![
            video_stream("18", "360p", Some(10)),
            video_stream("22", "720p", Some(20)),
        ];

        let hd = select_stream(&streams, &DownloadOption::hd()).unwrap();
        assert_eq!(hd.format_id, "22");

        let ld = select_stream(&streams, &DownloadOption::ld()).unwrap();
        assert_eq!(ld.format_id, "18");
    }

    #[test]
    fn test_select_stream_first_match_wins() {
        let streams = vec![
            video_stream("22a", "720p", Some(20)),
            video_stream("22b", "720p", Some(30)),
        ];

        let selected = select_stream(&streams, &DownloadOption::hd()).unwrap();
        assert_eq!(selected.format_id, "22a");
    }

    #[test]
    fn test_select_audio_requires_exact_abr() {
        let streams = vec![
            audio_stream("140", "128kbps", Some(5)),
            audio_stream("139", "48kbps", Some(2)),
        ];

        let selected = select_stream(&streams, &DownloadOption::audio()).unwrap();
        assert_eq!(selected.format_id, "140");

        let only_low = vec![audio_stream("139", "48kbps", Some(2))];
        assert!(select_stream(&only_low, &DownloadOption::audio()).is_none());
    }

    #[test]
    fn test_audio_option_ignores_video_streams() {
        let streams = vec![video_stream("22", "720p", Some(20))];
        assert!(select_stream(&streams, &DownloadOption::audio()).is_none());
    }

    #[test]
    fn test_video_size_label() {
        let video = video_with(vec![video_stream("22", "720p", Some(2 * 1_048_576))]);
        assert_eq!(video_size_label(&video, &DownloadOption::hd()), "2.0 MB");
        assert_eq!(
            video_size_label(&video, &DownloadOption::ld()),
            "Unavailable"
        );
    }

    #[test]
    fn test_playlist_availability_all_or_nothing() {
        let complete = vec![
            video_with(vec![video_stream("22", "720p", Some(10))]),
            video_with(vec![video_stream("22", "720p", Some(20))]),
        ];
        assert!(playlist_streams(&complete, &DownloadOption::hd()).is_some());

        let partial = vec![
            video_with(vec![video_stream("22", "720p", Some(10))]),
            video_with(vec![video_stream("18", "360p", Some(5))]),
        ];
        assert!(playlist_streams(&partial, &DownloadOption::hd()).is_none());
        assert_eq!(
            playlist_size_label(&partial, &DownloadOption::hd()),
            "Unavailable"
        );
    }

    #[test]
    fn test_playlist_size_sums_known_sizes() {
        let videos = vec![
            video_with(vec![video_stream("22", "720p", Some(1_048_576))]),
            video_with(vec![video_stream("22", "720p", Some(2 * 1_048_576))]),
            video_with(vec![video_stream("22", "720p", None)]),
        ];

        assert_eq!(
            playlist_size(&videos, &DownloadOption::hd()),
            Some(3 * 1_048_576)
        );
        assert_eq!(
            playlist_size_label(&videos, &DownloadOption::hd()),
            "3.0 MB"
        );
    }
}
