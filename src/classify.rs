//! Stream-format classification for successful extractions.
//!
//! A pure, deterministic pass over the raw descriptor list: unusable
//! entries (no direct URL, or a manifest-only adaptive-streaming endpoint)
//! are dropped, the rest are partitioned into audio-only and video-capable
//! lists, and a single preview candidate is chosen for players that just
//! want "the obvious stream".

use serde::Serialize;

use crate::extract::{RawMediaInfo, StreamDescriptor};

/// URL fragments identifying adaptive-streaming manifests rather than
/// direct media byte streams.
const MANIFEST_MARKERS: [&str; 4] = [
    "manifest.googlevideo.com",
    "/manifest/",
    ".m3u8",
    ".mpd",
];

/// Classified extraction result returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedMedia {
    /// Video title.
    pub title: Option<String>,
    /// Duration in seconds.
    pub duration_seconds: Option<f64>,
    /// Thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// Audio-only streams, larger sizes first.
    pub audio_streams: Vec<StreamDescriptor>,
    /// Video-capable streams (combined streams included, their `has_audio`
    /// flag marking them), greater heights first.
    pub video_streams: Vec<StreamDescriptor>,
    /// Best preview candidate among the video streams.
    pub preview_stream: Option<StreamDescriptor>,
}

/// True when the descriptor points at a manifest rather than fetchable
/// media bytes.
fn is_manifest_url(url: &str) -> bool {
    MANIFEST_MARKERS.iter().any(|marker| url.contains(marker))
}

/// True when the descriptor survives filtering: a direct URL and at least
/// one of audio/video present.
fn is_usable(stream: &StreamDescriptor) -> bool {
    !stream.url.is_empty() && !is_manifest_url(&stream.url) && (stream.has_video || stream.has_audio)
}

/// Container preference for preview selection; lower ranks are more broadly
/// playable. mp4 beats webm beats anything exotic.
fn container_rank(container: &str) -> u8 {
    match container {
        "mp4" | "m4v" => 0,
        "webm" => 1,
        _ => 2,
    }
}

/// Picks the preview candidate from the video-capable streams in their
/// first-seen order: restrict to the most compatible container present,
/// then take the greatest known height, keeping the earliest on ties.
fn select_preview(videos: &[StreamDescriptor]) -> Option<StreamDescriptor> {
    let best_rank = videos
        .iter()
        .map(|s| container_rank(&s.container))
        .min()?;

    let mut best: Option<&StreamDescriptor> = None;
    for candidate in videos
        .iter()
        .filter(|s| container_rank(&s.container) == best_rank)
    {
        let better = match best {
            None => true,
            // Strictly-greater keeps the first-seen stream on height ties.
            Some(current) => candidate.height_px.unwrap_or(0) > current.height_px.unwrap_or(0),
        };
        if better {
            best = Some(candidate);
        }
    }
    best.cloned()
}

/// Descending comparison pushing unknown values last; used with a stable
/// sort so unknowns keep their original relative order.
fn descending_unknown_last<T: Ord + Copy>(a: Option<T>, b: Option<T>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

/// Classifies raw extraction output into the response shape.
///
/// Deterministic and pure: the same [`RawMediaInfo`] always produces the
/// same [`ClassifiedMedia`], and re-running it over its own retained
/// streams changes nothing.
#[must_use]
pub fn classify(raw: &RawMediaInfo) -> ClassifiedMedia {
    let mut audio_streams: Vec<StreamDescriptor> = Vec::new();
    let mut video_streams: Vec<StreamDescriptor> = Vec::new();

    for stream in raw.streams.iter().filter(|s| is_usable(s)) {
        if stream.has_video {
            video_streams.push(stream.clone());
        } else {
            audio_streams.push(stream.clone());
        }
    }

    // Preview is chosen from first-seen order, before presentation sorting.
    let preview_stream = select_preview(&video_streams);

    video_streams.sort_by(|a, b| descending_unknown_last(a.height_px, b.height_px));
    audio_streams.sort_by(|a, b| descending_unknown_last(a.byte_size, b.byte_size));

    ClassifiedMedia {
        title: raw.title.clone(),
        duration_seconds: raw.duration_seconds,
        thumbnail_url: raw.thumbnail_url.clone(),
        audio_streams,
        video_streams,
        preview_stream,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stream(
        format_id: &str,
        container: &str,
        height_px: Option<u32>,
        byte_size: Option<u64>,
        has_video: bool,
        has_audio: bool,
    ) -> StreamDescriptor {
        StreamDescriptor {
            format_id: format_id.to_string(),
            container: container.to_string(),
            height_px,
            byte_size,
            has_video,
            has_audio,
            url: format!("https://cdn.example.com/{format_id}"),
        }
    }

    fn raw(streams: Vec<StreamDescriptor>) -> RawMediaInfo {
        RawMediaInfo {
            title: Some("Example".to_string()),
            duration_seconds: Some(212.0),
            thumbnail_url: Some("https://i.ytimg.com/vi/x/hq.jpg".to_string()),
            streams,
            downloaded_path: None,
        }
    }

    #[test]
    fn test_partition_audio_and_video() {
        let classified = classify(&raw(vec![
            stream("140", "m4a", None, Some(500), false, true),
            stream("22", "mp4", Some(720), None, true, true),
        ]));
        assert_eq!(classified.audio_streams.len(), 1);
        assert_eq!(classified.video_streams.len(), 1);
        assert_eq!(
            classified.preview_stream.as_ref().unwrap().height_px,
            Some(720)
        );
    }

    #[test]
    fn test_combined_stream_counted_once_in_video_list() {
        let classified = classify(&raw(vec![stream(
            "22",
            "mp4",
            Some(720),
            None,
            true,
            true,
        )]));
        assert_eq!(classified.audio_streams.len(), 0);
        assert_eq!(classified.video_streams.len(), 1);
        assert!(classified.video_streams[0].has_audio);
    }

    #[test]
    fn test_partition_completeness() {
        let input = vec![
            stream("a", "m4a", None, Some(1), false, true),
            stream("b", "mp4", Some(360), None, true, false),
            stream("c", "webm", Some(720), None, true, true),
            stream("d", "opus", None, Some(2), false, true),
        ];
        let classified = classify(&raw(input.clone()));
        let total = classified.audio_streams.len() + classified.video_streams.len();
        assert_eq!(total, input.len());
        for s in &input {
            let in_audio = classified.audio_streams.contains(s);
            let in_video = classified.video_streams.contains(s);
            assert!(in_audio ^ in_video, "{} must appear exactly once", s.format_id);
        }
    }

    #[test]
    fn test_manifest_and_empty_urls_are_discarded() {
        let mut manifest = stream("hls", "mp4", Some(1080), None, true, true);
        manifest.url = "https://manifest.googlevideo.com/api/manifest/hls".to_string();
        let mut m3u8 = stream("m3u8", "mp4", Some(720), None, true, true);
        m3u8.url = "https://cdn.example.com/playlist.m3u8".to_string();
        let mut empty = stream("none", "mp4", Some(480), None, true, true);
        empty.url = String::new();

        let classified = classify(&raw(vec![
            manifest,
            m3u8,
            empty,
            stream("18", "mp4", Some(360), None, true, true),
        ]));
        assert_eq!(classified.video_streams.len(), 1);
        assert_eq!(classified.video_streams[0].format_id, "18");
    }

    #[test]
    fn test_descriptor_with_neither_track_is_discarded() {
        let classified = classify(&raw(vec![stream("sb", "mhtml", None, None, false, false)]));
        assert!(classified.audio_streams.is_empty());
        assert!(classified.video_streams.is_empty());
    }

    #[test]
    fn test_video_sorted_by_height_descending_unknown_last() {
        let classified = classify(&raw(vec![
            stream("a", "mp4", Some(360), None, true, false),
            stream("b", "mp4", None, None, true, false),
            stream("c", "mp4", Some(1080), None, true, false),
            stream("d", "mp4", None, None, true, false),
        ]));
        let ids: Vec<&str> = classified
            .video_streams
            .iter()
            .map(|s| s.format_id.as_str())
            .collect();
        // Unknown heights sort last, preserving their relative order.
        assert_eq!(ids, ["c", "a", "b", "d"]);
    }

    #[test]
    fn test_audio_sorted_by_size_descending_unknown_last() {
        let classified = classify(&raw(vec![
            stream("small", "m4a", None, Some(100), false, true),
            stream("nosize", "m4a", None, None, false, true),
            stream("big", "m4a", None, Some(9000), false, true),
        ]));
        let ids: Vec<&str> = classified
            .audio_streams
            .iter()
            .map(|s| s.format_id.as_str())
            .collect();
        assert_eq!(ids, ["big", "small", "nosize"]);
    }

    #[test]
    fn test_preview_prefers_compatible_container_over_height() {
        let classified = classify(&raw(vec![
            stream("vp9", "webm", Some(2160), None, true, false),
            stream("h264", "mp4", Some(1080), None, true, true),
        ]));
        assert_eq!(classified.preview_stream.unwrap().format_id, "h264");
    }

    #[test]
    fn test_preview_takes_greatest_height_within_container() {
        let classified = classify(&raw(vec![
            stream("low", "mp4", Some(360), None, true, true),
            stream("high", "mp4", Some(1080), None, true, true),
            stream("mid", "mp4", Some(720), None, true, true),
        ]));
        assert_eq!(classified.preview_stream.unwrap().format_id, "high");
    }

    #[test]
    fn test_preview_tie_keeps_first_seen() {
        let classified = classify(&raw(vec![
            stream("first", "mp4", Some(720), None, true, true),
            stream("second", "mp4", Some(720), None, true, false),
        ]));
        assert_eq!(classified.preview_stream.unwrap().format_id, "first");
    }

    #[test]
    fn test_preview_none_without_video_streams() {
        let classified = classify(&raw(vec![stream("140", "m4a", None, Some(1), false, true)]));
        assert!(classified.preview_stream.is_none());
    }

    #[test]
    fn test_classify_is_deterministic() {
        let input = raw(vec![
            stream("a", "webm", Some(720), Some(10), true, false),
            stream("b", "m4a", None, Some(5), false, true),
        ]);
        assert_eq!(classify(&input), classify(&input));
    }

    #[test]
    fn test_classify_is_idempotent_on_retained_streams() {
        let first = classify(&raw(vec![
            stream("a", "mp4", Some(1080), None, true, true),
            stream("b", "m4a", None, Some(100), false, true),
            {
                let mut m = stream("hls", "mp4", Some(720), None, true, true);
                m.url = "https://cdn.example.com/index.m3u8".to_string();
                m
            },
        ]));

        let mut retained = first.video_streams.clone();
        retained.extend(first.audio_streams.clone());
        let second = classify(&RawMediaInfo {
            title: first.title.clone(),
            duration_seconds: first.duration_seconds,
            thumbnail_url: first.thumbnail_url.clone(),
            streams: retained,
            downloaded_path: None,
        });

        assert_eq!(first, second);
    }

    #[test]
    fn test_metadata_passthrough() {
        let classified = classify(&raw(vec![]));
        assert_eq!(classified.title.as_deref(), Some("Example"));
        assert_eq!(classified.duration_seconds, Some(212.0));
        assert!(classified.thumbnail_url.is_some());
    }
}
