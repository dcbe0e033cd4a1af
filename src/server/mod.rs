//! HTTP surface: routing, shared state, and error-to-response mapping.
//!
//! The handlers are thin: query parsing, a call through the extraction
//! runner, response shaping. Every terminal failure renders as
//! `{"success": false, "error": ...}` with the status dictated by the
//! error taxonomy; blocked-upstream exhaustion additionally carries a
//! `tip` telling the caller what might actually help.

mod handlers;

pub use handlers::{download, home, video_info};

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

use crate::artifact::ArtifactStore;
use crate::extract::ExtractError;
use crate::retry::ExtractionRunner;

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Retry orchestrator over the configured extractor.
    pub runner: Arc<ExtractionRunner>,
    /// Staged-download lifecycle manager.
    pub artifacts: Arc<ArtifactStore>,
}

/// Terminal request failure, ready to render as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    tip: Option<&'static str>,
}

impl ApiError {
    /// Client-input failure (HTTP 400).
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            tip: None,
        }
    }

    /// Server-side failure (HTTP 500) with the generic retry tip.
    pub fn internal(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
            tip: Some(RETRY_TIP),
        }
    }

    /// The HTTP status this error renders with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Tip for blocked-upstream exhaustion: identity rotation already failed,
/// so only time or a different egress address will help.
const BLOCKED_TIP: &str =
    "The upstream is rate-limiting this server. Retry in a few minutes or from a different network.";

/// Tip for transient exhaustion.
const RETRY_TIP: &str = "Could not reach the upstream. Try again later.";

impl From<ExtractError> for ApiError {
    fn from(error: ExtractError) -> Self {
        let (status, tip) = match &error {
            ExtractError::InvalidUrl { .. } => (StatusCode::BAD_REQUEST, None),
            ExtractError::NotFound { .. } => (StatusCode::NOT_FOUND, None),
            ExtractError::Blocked { .. } => (StatusCode::TOO_MANY_REQUESTS, Some(BLOCKED_TIP)),
            ExtractError::Unavailable { .. }
            | ExtractError::Unknown { .. }
            | ExtractError::ArtifactMissing { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, Some(RETRY_TIP))
            }
        };
        Self {
            status,
            error: error.to_string(),
            tip,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "success": false,
            "error": self.error,
        });
        if let Some(tip) = self.tip {
            body["tip"] = serde_json::Value::String(tip.to_string());
        }
        (self.status, Json(body)).into_response()
    }
}

/// Builds the service router over the given state.
#[must_use]
pub fn router(state: AppState) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    axum::Router::new()
        .route("/", get(home))
        .route("/api/video-info", get(video_info))
        .route("/api/download", get(download))
        .with_state(state)
        .layer(cors)
}
