//! Production [`Extractor`] backed by the `yt-dlp` binary.
//!
//! Each attempt runs one child process with verbose diagnostics suppressed,
//! cookies disabled, adaptive-manifest variants skipped, and the attempt's
//! identity applied via `--user-agent`, `--referer`, and `--add-headers`.
//! Metadata runs use `-J` and parse the single-JSON dump; download runs use
//! `--print after_move:filepath` to learn the final on-disk path. Child
//! failures are classified through [`classify_extractor_failure`].

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{
    ExtractError, ExtractionConfig, ExtractionMode, Extractor, RawMediaInfo, StreamDescriptor,
    classify_extractor_failure,
};
use crate::identity::RequestIdentity;

/// Default wall-clock budget for one yt-dlp run.
const DEFAULT_CHILD_TIMEOUT: Duration = Duration::from_secs(180);

/// Default download format selection: prefer a combined mp4, fall back to
/// merged best streams.
const DEFAULT_VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]";

/// Audio-only selection, extracted to mp3 by the child.
const AUDIO_FORMAT: &str = "bestaudio/best";

/// Extractor implementation shelling out to `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary: PathBuf,
    child_timeout: Duration,
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpExtractor {
    /// Creates an extractor using `yt-dlp` from `PATH` with the default
    /// timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            child_timeout: DEFAULT_CHILD_TIMEOUT,
        }
    }

    /// Overrides the binary location (e.g. a vendored yt-dlp).
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Overrides the per-run wall-clock budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.child_timeout = timeout;
        self
    }
}

/// Builds the full argument list for one yt-dlp run.
fn build_args(url: &str, config: &ExtractionConfig, identity: &RequestIdentity) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--no-playlist".into(),
        "--no-warnings".into(),
        "--no-progress".into(),
        "--no-cache-dir".into(),
        // Never read persisted credentials; the whole point of identity
        // rotation is that attempts are unlinkable.
        "--no-cookies-from-browser".into(),
        "--extractor-args".into(),
        "youtube:skip=hls,dash,translated_subs".into(),
        "--user-agent".into(),
        identity.user_agent.clone(),
        "--referer".into(),
        identity.referer().into(),
    ];

    for (name, value) in &identity.headers {
        args.push("--add-headers".into());
        args.push(format!("{name}:{value}"));
    }

    match &config.mode {
        ExtractionMode::Metadata => {
            args.push("--dump-single-json".into());
            args.push("--skip-download".into());
        }
        ExtractionMode::Download { output_dir } => {
            if config.audio_only {
                args.push("-f".into());
                args.push(AUDIO_FORMAT.into());
                args.push("-x".into());
                args.push("--audio-format".into());
                args.push("mp3".into());
            } else if let Some(format_id) = &config.format_id {
                args.push("-f".into());
                args.push(format_id.clone());
            } else {
                args.push("-f".into());
                args.push(DEFAULT_VIDEO_FORMAT.into());
            }
            args.push("-o".into());
            args.push(
                output_dir
                    .join("%(title)s.%(ext)s")
                    .to_string_lossy()
                    .into_owned(),
            );
            // --print implies simulate; --no-simulate restores the actual
            // download while still printing the final path.
            args.push("--print".into());
            args.push("after_move:filepath".into());
            args.push("--no-simulate".into());
            args.push("--quiet".into());
        }
    }

    args.push("--".into());
    args.push(url.into());
    args
}

/// Subset of yt-dlp's single-JSON dump that the service consumes.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    format_id: Option<String>,
    ext: Option<String>,
    height: Option<u32>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
    vcodec: Option<String>,
    acodec: Option<String>,
    url: Option<String>,
}

/// True when a yt-dlp codec field names an actual codec ("none" and absent
/// both mean the track is missing).
fn codec_present(codec: Option<&str>) -> bool {
    matches!(codec, Some(c) if !c.is_empty() && c != "none")
}

/// Converts a parsed dump into the service's raw media model.
fn into_raw_info(info: YtDlpInfo) -> RawMediaInfo {
    let streams = info
        .formats
        .into_iter()
        .map(|fmt| StreamDescriptor {
            format_id: fmt.format_id.unwrap_or_default(),
            container: fmt.ext.unwrap_or_default(),
            height_px: fmt.height,
            byte_size: fmt.filesize.or(fmt.filesize_approx),
            has_video: codec_present(fmt.vcodec.as_deref()),
            has_audio: codec_present(fmt.acodec.as_deref()),
            url: fmt.url.unwrap_or_default(),
        })
        .collect();

    RawMediaInfo {
        title: info.title,
        duration_seconds: info.duration,
        thumbnail_url: info.thumbnail,
        streams,
        downloaded_path: None,
    }
}

/// Parses the metadata dump from a successful `-J` run.
fn parse_metadata_output(stdout: &[u8]) -> Result<RawMediaInfo, ExtractError> {
    let info: YtDlpInfo = serde_json::from_slice(stdout)
        .map_err(|e| ExtractError::unknown(format!("unparseable yt-dlp JSON output: {e}")))?;
    Ok(into_raw_info(info))
}

/// Parses the printed final filepath from a successful download run.
fn parse_download_output(stdout: &[u8]) -> Result<RawMediaInfo, ExtractError> {
    let printed = String::from_utf8_lossy(stdout);
    let path = printed
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| ExtractError::unknown("yt-dlp did not report a downloaded filepath"))?;

    Ok(RawMediaInfo {
        downloaded_path: Some(PathBuf::from(path)),
        ..RawMediaInfo::default()
    })
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn extract(
        &self,
        url: &str,
        config: &ExtractionConfig,
        identity: &RequestIdentity,
    ) -> Result<RawMediaInfo, ExtractError> {
        let args = build_args(url, config, identity);
        debug!(binary = %self.binary.display(), url, "spawning yt-dlp");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.child_timeout, child).await {
            Err(_) => {
                warn!(url, timeout_secs = self.child_timeout.as_secs(), "yt-dlp timed out");
                return Err(ExtractError::unavailable(format!(
                    "extractor timed out after {}s",
                    self.child_timeout.as_secs()
                )));
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractError::unknown(
                    "yt-dlp binary not found; install yt-dlp and ensure it is on PATH",
                ));
            }
            Ok(Err(e)) => {
                return Err(ExtractError::unavailable(format!(
                    "failed to run extractor: {e}"
                )));
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .last()
                .unwrap_or("yt-dlp exited with an error");
            debug!(url, status = ?output.status.code(), error = message, "yt-dlp failed");
            return Err(classify_extractor_failure(message));
        }

        match &config.mode {
            ExtractionMode::Metadata => parse_metadata_output(&output.stdout),
            ExtractionMode::Download { .. } => parse_download_output(&output.stdout),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::IdentityRotator;

    fn identity() -> RequestIdentity {
        IdentityRotator::new().next()
    }

    #[test]
    fn test_metadata_args_request_json_dump_without_download() {
        let args = build_args(
            "https://youtu.be/dQw4w9WgXcQ",
            &ExtractionConfig::metadata(),
            &identity(),
        );
        assert!(args.contains(&"--dump-single-json".to_string()));
        assert!(args.contains(&"--skip-download".to_string()));
        assert!(!args.iter().any(|a| a == "-o"));
    }

    #[test]
    fn test_args_apply_identity() {
        let identity = identity();
        let args = build_args(
            "https://youtu.be/dQw4w9WgXcQ",
            &ExtractionConfig::metadata(),
            &identity,
        );
        let ua_pos = args.iter().position(|a| a == "--user-agent").unwrap();
        assert_eq!(args[ua_pos + 1], identity.user_agent);
        assert!(
            args.iter()
                .any(|a| a == &format!("X-Forwarded-For:{}", identity.spoofed_origin))
        );
        assert!(args.contains(&"--referer".to_string()));
    }

    #[test]
    fn test_args_suppress_diagnostics_and_credentials() {
        let args = build_args(
            "https://youtu.be/dQw4w9WgXcQ",
            &ExtractionConfig::metadata(),
            &identity(),
        );
        assert!(args.contains(&"--no-warnings".to_string()));
        assert!(args.contains(&"--no-cookies-from-browser".to_string()));
        assert!(args.contains(&"youtube:skip=hls,dash,translated_subs".to_string()));
    }

    #[test]
    fn test_download_args_default_format_and_output_template() {
        let request = super::super::MediaRequest::new("https://youtu.be/dQw4w9WgXcQ");
        let config = ExtractionConfig::download(&request, PathBuf::from("/tmp/req-1"));
        let args = build_args(&request.source_url, &config, &identity());

        let f_pos = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f_pos + 1], DEFAULT_VIDEO_FORMAT);
        let o_pos = args.iter().position(|a| a == "-o").unwrap();
        assert!(args[o_pos + 1].starts_with("/tmp/req-1/"));
        assert!(args.contains(&"after_move:filepath".to_string()));
        assert!(args.contains(&"--no-simulate".to_string()));
    }

    #[test]
    fn test_download_args_explicit_format_id() {
        let request = super::super::MediaRequest {
            source_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            want_audio_only: false,
            explicit_format_id: Some("137+140".to_string()),
        };
        let config = ExtractionConfig::download(&request, PathBuf::from("/tmp/req-2"));
        let args = build_args(&request.source_url, &config, &identity());
        let f_pos = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f_pos + 1], "137+140");
    }

    #[test]
    fn test_download_args_audio_only_extracts_mp3() {
        let request = super::super::MediaRequest {
            source_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            want_audio_only: true,
            explicit_format_id: None,
        };
        let config = ExtractionConfig::download(&request, PathBuf::from("/tmp/req-3"));
        let args = build_args(&request.source_url, &config, &identity());
        assert!(args.contains(&"-x".to_string()));
        assert!(args.contains(&"mp3".to_string()));
        let f_pos = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f_pos + 1], AUDIO_FORMAT);
    }

    #[test]
    fn test_url_is_terminated_by_double_dash() {
        let args = build_args("-not-an-option", &ExtractionConfig::metadata(), &identity());
        let sep = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(args[sep + 1], "-not-an-option");
        assert_eq!(sep + 2, args.len());
    }

    #[test]
    fn test_parse_metadata_output_maps_fields() {
        let json = r#"{
            "title": "Example",
            "duration": 212.5,
            "thumbnail": "https://i.ytimg.com/vi/x/hq.jpg",
            "formats": [
                {"format_id": "140", "ext": "m4a", "filesize": 3400000,
                 "vcodec": "none", "acodec": "mp4a.40.2", "url": "https://cdn/a"},
                {"format_id": "22", "ext": "mp4", "height": 720,
                 "vcodec": "avc1", "acodec": "mp4a.40.2", "url": "https://cdn/v"}
            ]
        }"#;
        let raw = parse_metadata_output(json.as_bytes()).unwrap();
        assert_eq!(raw.title.as_deref(), Some("Example"));
        assert_eq!(raw.duration_seconds, Some(212.5));
        assert_eq!(raw.streams.len(), 2);

        let audio = &raw.streams[0];
        assert!(audio.has_audio && !audio.has_video);
        assert_eq!(audio.byte_size, Some(3_400_000));

        let video = &raw.streams[1];
        assert!(video.has_video && video.has_audio);
        assert_eq!(video.height_px, Some(720));
    }

    #[test]
    fn test_parse_metadata_output_uses_approx_filesize_fallback() {
        let json = r#"{"formats": [
            {"format_id": "18", "ext": "mp4", "filesize_approx": 999,
             "vcodec": "avc1", "acodec": "mp4a", "url": "https://cdn/v"}
        ]}"#;
        let raw = parse_metadata_output(json.as_bytes()).unwrap();
        assert_eq!(raw.streams[0].byte_size, Some(999));
    }

    #[test]
    fn test_parse_metadata_output_rejects_garbage() {
        assert!(matches!(
            parse_metadata_output(b"not json"),
            Err(ExtractError::Unknown { .. })
        ));
    }

    #[test]
    fn test_parse_download_output_takes_last_nonempty_line() {
        let raw = parse_download_output(b"/tmp/req/Example.mp4\n\n").unwrap();
        assert_eq!(
            raw.downloaded_path.as_deref(),
            Some(std::path::Path::new("/tmp/req/Example.mp4"))
        );
    }

    #[test]
    fn test_parse_download_output_empty_is_error() {
        assert!(matches!(
            parse_download_output(b"\n"),
            Err(ExtractError::Unknown { .. })
        ));
    }

    #[test]
    fn test_codec_present() {
        assert!(codec_present(Some("avc1.64001F")));
        assert!(!codec_present(Some("none")));
        assert!(!codec_present(Some("")));
        assert!(!codec_present(None));
    }
}
