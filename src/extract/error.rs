//! Error taxonomy for extraction and the retry policy built on top of it.
//!
//! Every failure out of the external extractor is folded into one
//! [`ExtractError`] variant; the variant alone decides whether the retry
//! orchestrator rotates identity and backs off, waits briefly, or gives up.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by URL validation, extraction, and artifact handling.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The input does not match any recognized video URL shape.
    /// Client error; never retried.
    #[error("invalid video URL: {url}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
    },

    /// The video is absent, removed, or private. A permanent upstream
    /// condition a new identity cannot fix; never retried.
    #[error("video not found or unavailable: {message}")]
    NotFound {
        /// Upstream's description of the condition.
        message: String,
    },

    /// The upstream served a bot challenge or rate-limit rejection.
    /// Retried with exponential backoff under a fresh identity.
    #[error("upstream blocked the request: {message}")]
    Blocked {
        /// The challenge text reported by the extractor.
        message: String,
    },

    /// Network-level failure or extractor timeout. Retried with a short
    /// linear delay.
    #[error("upstream unavailable: {message}")]
    Unavailable {
        /// The underlying failure description.
        message: String,
    },

    /// Extraction reported success but the produced file is not on disk.
    /// Fatal for the request; not retried (extraction itself succeeded).
    #[error("downloaded file missing at {path}")]
    ArtifactMissing {
        /// Where the file was expected.
        path: PathBuf,
    },

    /// Anything the classifier could not place. Treated as transient.
    #[error("extraction failed: {message}")]
    Unknown {
        /// The unclassified failure text.
        message: String,
    },
}

// Note on From trait implementations: variants carry request context (url,
// path, upstream text) that source errors don't provide, so helper
// constructors are used instead of From impls, as in the download engine
// this taxonomy is modeled on.

impl ExtractError {
    /// Creates an invalid-URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a blocked-by-upstream error.
    pub fn blocked(message: impl Into<String>) -> Self {
        Self::Blocked {
            message: message.into(),
        }
    }

    /// Creates an upstream-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a missing-artifact error.
    pub fn artifact_missing(path: impl Into<PathBuf>) -> Self {
        Self::ArtifactMissing { path: path.into() }
    }

    /// Creates an unclassified error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// True for conditions a retry (with or without a new identity) cannot
    /// fix.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::NotFound { .. } | Self::ArtifactMissing { .. }
        )
    }
}

/// Markers of an upstream bot challenge or rate-limit rejection.
const BLOCKED_MARKERS: [&str; 6] = [
    "sign in to confirm",
    "not a bot",
    "captcha",
    "429",
    "too many requests",
    "unusual traffic",
];

/// Markers of a permanently absent video.
const NOT_FOUND_MARKERS: [&str; 7] = [
    "video unavailable",
    "private video",
    "has been removed",
    "does not exist",
    "account associated with this video has been terminated",
    "no longer available",
    "404",
];

/// Markers of transient network trouble.
const UNAVAILABLE_MARKERS: [&str; 7] = [
    "timed out",
    "timeout",
    "connection reset",
    "connection refused",
    "temporary failure",
    "unable to connect",
    "network",
];

/// Classifies raw extractor failure text into an [`ExtractError`].
///
/// Best-effort substring matching against known upstream wordings; the
/// marker tables track yt-dlp's error text and need updating when upstream
/// phrasing changes. Blocking markers are checked first since a challenge
/// page can mention the video title, then permanent absence, then network
/// trouble. Anything unrecognized degrades to [`ExtractError::Unknown`],
/// which the retry policy treats as transient rather than permanent.
#[must_use]
pub fn classify_extractor_failure(message: &str) -> ExtractError {
    let lowered = message.to_lowercase();

    if BLOCKED_MARKERS.iter().any(|m| lowered.contains(m)) {
        return ExtractError::blocked(message);
    }
    if NOT_FOUND_MARKERS.iter().any(|m| lowered.contains(m)) {
        return ExtractError::not_found(message);
    }
    if UNAVAILABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return ExtractError::unavailable(message);
    }
    ExtractError::unknown(message)
}
