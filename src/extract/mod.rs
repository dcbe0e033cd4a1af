//! Extraction seam: the opaque upstream extractor capability and the data
//! it produces.
//!
//! The actual scraping lives behind the [`Extractor`] trait so the retry
//! orchestrator and the HTTP layer can be exercised against scripted fakes.
//! The production implementation is [`YtDlpExtractor`], which drives the
//! `yt-dlp` binary as a child process.
//!
//! # Object Safety
//!
//! [`Extractor`] uses `async_trait` to support dynamic dispatch via
//! `Arc<dyn Extractor>`. Rust 2024 native async traits are not object-safe,
//! so `async_trait` is required for injection here.

mod error;
pub mod ytdlp;

pub use error::{ExtractError, classify_extractor_failure};
pub use ytdlp::YtDlpExtractor;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::identity::RequestIdentity;

/// One incoming media request, immutable once constructed.
#[derive(Debug, Clone)]
pub struct MediaRequest {
    /// The URL supplied by the caller.
    pub source_url: String,
    /// Whether the caller wants audio only (downloads extract to mp3).
    pub want_audio_only: bool,
    /// Caller-pinned format identifier, overriding default selection.
    pub explicit_format_id: Option<String>,
}

impl MediaRequest {
    /// Creates a metadata-only request for a URL.
    #[must_use]
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            want_audio_only: false,
            explicit_format_id: None,
        }
    }
}

/// What a single extraction attempt should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Resolve metadata and stream descriptors only; nothing touches disk.
    Metadata,
    /// Download the selected format into the given per-request directory.
    Download {
        /// Directory the extractor writes into. Unique per request, so
        /// concurrent downloads never collide.
        output_dir: PathBuf,
    },
}

/// Configuration for one extraction run, derived from a [`MediaRequest`].
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Metadata-only or download-to-disk.
    pub mode: ExtractionMode,
    /// Explicit format selector; `None` means the extractor's default
    /// best-quality selection.
    pub format_id: Option<String>,
    /// Audio-only download (extracted to mp3).
    pub audio_only: bool,
}

impl ExtractionConfig {
    /// Metadata-only configuration.
    #[must_use]
    pub fn metadata() -> Self {
        Self {
            mode: ExtractionMode::Metadata,
            format_id: None,
            audio_only: false,
        }
    }

    /// Download configuration for a request, writing into `output_dir`.
    #[must_use]
    pub fn download(request: &MediaRequest, output_dir: PathBuf) -> Self {
        Self {
            mode: ExtractionMode::Download { output_dir },
            format_id: request.explicit_format_id.clone(),
            audio_only: request.want_audio_only,
        }
    }
}

/// One stream variant reported by the upstream extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Extractor-assigned format identifier.
    pub format_id: String,
    /// Container/extension (mp4, webm, m4a, ...).
    pub container: String,
    /// Video height in pixels, when known.
    pub height_px: Option<u32>,
    /// Size in bytes, when known.
    pub byte_size: Option<u64>,
    /// Whether the stream carries video.
    pub has_video: bool,
    /// Whether the stream carries audio.
    pub has_audio: bool,
    /// Direct media URL (may be a manifest URL; the classifier filters
    /// those out).
    pub url: String,
}

/// Raw extraction output: metadata plus the full descriptor list, read-only
/// input to the format classifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMediaInfo {
    /// Video title.
    pub title: Option<String>,
    /// Duration in seconds.
    pub duration_seconds: Option<f64>,
    /// Thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// All stream descriptors reported by the extractor, unfiltered.
    pub streams: Vec<StreamDescriptor>,
    /// Path of the downloaded file, set only for download-mode runs.
    pub downloaded_path: Option<PathBuf>,
}

/// The opaque external extraction capability.
///
/// Implementations take a URL, a run configuration, and the identity to
/// present upstream, and either return raw media info or a classified
/// [`ExtractError`]. Implementations must be safe to call concurrently.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Returns the extractor's name (e.g. "yt-dlp").
    fn name(&self) -> &str;

    /// Runs one extraction attempt under the given identity.
    async fn extract(
        &self,
        url: &str,
        config: &ExtractionConfig,
        identity: &RequestIdentity,
    ) -> Result<RawMediaInfo, ExtractError>;
}
