//! Request handlers for the three service endpoints.

use axum::Json;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::info;

use super::{ApiError, AppState};
use crate::classify::classify;
use crate::extract::{ExtractError, ExtractionConfig, MediaRequest};
use crate::validate::validate;

/// Query parameters for `/api/video-info`.
#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    url: Option<String>,
}

/// Query parameters for `/api/download`.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    url: Option<String>,
    format_id: Option<String>,
    audio_only: Option<String>,
}

/// `GET /` - service metadata.
pub async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "streamgate",
        "status": "running",
        "endpoints": [
            "/api/video-info?url=VIDEO_URL",
            "/api/download?url=VIDEO_URL&format_id=ID&audio_only=true",
        ],
    }))
}

/// `GET /api/video-info?url=` - resolve a video URL to classified stream
/// metadata.
pub async fn video_info(
    State(state): State<AppState>,
    Query(query): Query<InfoQuery>,
) -> Result<Response, ApiError> {
    let raw_url = query
        .url
        .ok_or_else(|| ApiError::bad_request("Missing 'url' parameter."))?;
    let video_id = validate(&raw_url)?;
    info!(video_id = %video_id, "video-info request");

    let raw = state
        .runner
        .fetch(&video_id.watch_url(), &ExtractionConfig::metadata())
        .await?;
    let data = classify(&raw);

    Ok(Json(serde_json::json!({
        "success": true,
        "data": data,
    }))
    .into_response())
}

/// `GET /api/download?url=&format_id=&audio_only=` - download the selected
/// format, stage it for timed cleanup, and stream it back as an attachment.
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let raw_url = query
        .url
        .ok_or_else(|| ApiError::bad_request("Missing 'url' parameter."))?;
    let video_id = validate(&raw_url)?;
    let audio_only = parse_bool_param(query.audio_only.as_deref());
    info!(video_id = %video_id, audio_only, format_id = ?query.format_id, "download request");

    let request = MediaRequest {
        source_url: video_id.watch_url(),
        want_audio_only: audio_only,
        explicit_format_id: query.format_id,
    };

    let output_dir = state
        .artifacts
        .allocate_request_dir()
        .map_err(|e| ApiError::internal(format!("failed to allocate download dir: {e}")))?;
    let config = ExtractionConfig::download(&request, output_dir.clone());

    // A failed download never stages anything, so no cleanup timer would
    // ever reclaim the allocated directory (or partial output inside it).
    // Discard it here instead of leaving an orphan under the temp root.
    let (file_path, metadata) = match fetch_downloaded_file(&state, &request.source_url, &config)
        .await
    {
        Ok(found) => found,
        Err(error) => {
            state.artifacts.discard_request_dir(&output_dir).await;
            return Err(error.into());
        }
    };

    // Stage before responding: the cleanup timer is detached from this
    // request, so the connection can close long before it fires.
    let artifact = state.artifacts.stage(file_path.clone());

    let filename = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    let file = tokio::fs::File::open(&artifact.file_path)
        .await
        .map_err(|_| ExtractError::artifact_missing(&artifact.file_path))?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&filename)),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&filename))
            .map_err(|_| ApiError::internal("failed to build download headers"))?,
    );

    Ok((headers, body).into_response())
}

/// Runs the download and resolves the produced file, verifying it actually
/// exists before the caller commits to streaming it.
async fn fetch_downloaded_file(
    state: &AppState,
    url: &str,
    config: &ExtractionConfig,
) -> Result<(std::path::PathBuf, std::fs::Metadata), ExtractError> {
    let raw = state.runner.fetch(url, config).await?;
    let file_path = raw
        .downloaded_path
        .ok_or_else(|| ExtractError::unknown("extractor reported no downloaded file"))?;
    let metadata = tokio::fs::metadata(&file_path)
        .await
        .map_err(|_| ExtractError::artifact_missing(&file_path))?;
    Ok((file_path, metadata))
}

/// Tolerant boolean query parsing ("true"/"1"/"yes", case-insensitive).
fn parse_bool_param(value: Option<&str>) -> bool {
    matches!(
        value.map(str::trim),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" || v.eq_ignore_ascii_case("yes")
    )
}

/// Content type by filename extension.
fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("opus" | "ogg") => "audio/ogg",
        Some("mp4" | "m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

/// `Content-Disposition: attachment` with a header-safe ASCII filename.
fn content_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}
