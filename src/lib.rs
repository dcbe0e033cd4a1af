//! Streamgate Core Library
//!
//! Streamgate is a bot-resistant HTTP API that resolves public video URLs
//! to stream metadata and direct downloads, retrying extraction under
//! rotating identities when the upstream fingerprints and blocks
//! automated clients.
//!
//! # Architecture
//!
//! - [`validate`] - video URL validation and identifier extraction
//! - [`identity`] - per-attempt rotating request identities
//! - [`extract`] - the opaque extractor capability and its yt-dlp backend
//! - [`retry`] - bounded retry with dual backoff and identity rotation
//! - [`classify`] - stream-format classification of raw extraction output
//! - [`artifact`] - time-boxed lifecycle of downloaded files
//! - [`server`] - the axum HTTP surface

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod artifact;
pub mod classify;
pub mod extract;
pub mod identity;
pub mod retry;
pub mod server;
pub mod validate;

// Re-export commonly used types
pub use artifact::{ArtifactStore, DEFAULT_RETENTION, StagedArtifact, remove_artifact};
pub use classify::{ClassifiedMedia, classify};
pub use extract::{
    ExtractError, ExtractionConfig, ExtractionMode, Extractor, MediaRequest, RawMediaInfo,
    StreamDescriptor, YtDlpExtractor, classify_extractor_failure,
};
pub use identity::{IdentityRotator, RequestIdentity};
pub use retry::{
    DEFAULT_BLOCKED_BACKOFF_BASE, DEFAULT_MAX_ATTEMPTS, ExtractionRunner, RetryDecision,
    RetryPolicy,
};
pub use server::{ApiError, AppState, router};
pub use validate::{VideoId, validate};
