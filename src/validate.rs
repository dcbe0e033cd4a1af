//! Video URL validation and identifier extraction.
//!
//! Accepts the three public YouTube link shapes (watch page, short link,
//! embed) and extracts the 11-character video identifier. Matching is
//! anchored to the recognized positions so a look-alike identifier buried
//! elsewhere in a URL is not accepted.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::extract::ExtractError;

/// Character class of a YouTube video identifier (always 11 chars).
const ID_CLASS: &str = "[A-Za-z0-9_-]{11}";

/// Watch-page form: the identifier lives in the `v` query parameter.
/// `https://www.youtube.com/watch?v=<id>`, possibly with other parameters
/// before or after `v`.
#[allow(clippy::expect_used)]
static WATCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?:(?:https?:)?//)?(?:www\.|m\.)?youtube\.com/watch\?(?:[^#]*&)?v=({ID_CLASS})(?:[&#]|$)"
    ))
    .expect("watch URL regex is valid") // Static pattern, safe to panic
});

/// Short-link form: the identifier is the first path segment.
/// `https://youtu.be/<id>`.
#[allow(clippy::expect_used)]
static SHORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?:(?:https?:)?//)?youtu\.be/({ID_CLASS})(?:[?&#/]|$)"
    ))
    .expect("short URL regex is valid")
});

/// Embed form: the identifier follows `/embed/`. The no-cookie embed host
/// is accepted as well.
#[allow(clippy::expect_used)]
static EMBED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?:(?:https?:)?//)?(?:www\.)?(?:youtube|youtube-nocookie)\.com/embed/({ID_CLASS})(?:[?&#/]|$)"
    ))
    .expect("embed URL regex is valid")
});

/// A validated 11-character video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch-page URL for this identifier.
    #[must_use]
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validates a candidate video URL and extracts its identifier.
///
/// Recognized shapes (scheme optional, `www.`/`m.` prefixes tolerated):
/// - `youtube.com/watch?v=<id>` (query identifier)
/// - `youtu.be/<id>` (path identifier)
/// - `youtube.com/embed/<id>` and `youtube-nocookie.com/embed/<id>`
///
/// All three shapes with the same identifier yield the same [`VideoId`].
///
/// # Errors
///
/// Returns [`ExtractError::InvalidUrl`] when no recognized shape matches.
pub fn validate(raw: &str) -> Result<VideoId, ExtractError> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return Err(ExtractError::invalid_url(raw));
    }

    for pattern in [&*WATCH_PATTERN, &*SHORT_PATTERN, &*EMBED_PATTERN] {
        if let Some(captures) = pattern.captures(candidate) {
            if let Some(id) = captures.get(1) {
                debug!(video_id = id.as_str(), "URL validated");
                return Ok(VideoId(id.as_str().to_string()));
            }
        }
    }

    debug!(url = candidate, "URL validation failed");
    Err(ExtractError::invalid_url(candidate))
}
