//! Shared test support: a scripted fake extractor standing in for the
//! opaque upstream capability.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use streamgate::{
    ExtractError, ExtractionConfig, ExtractionMode, Extractor, RawMediaInfo, RequestIdentity,
    StreamDescriptor,
};

/// One scripted attempt outcome.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Return the given raw info.
    Success(RawMediaInfo),
    /// Write `bytes` to `filename` inside the attempt's download dir and
    /// return its path (download-mode attempts only).
    DownloadSuccess {
        filename: &'static str,
        bytes: &'static [u8],
    },
    Blocked(&'static str),
    NotFound(&'static str),
    Unavailable(&'static str),
    Unknown(&'static str),
}

/// Extractor that plays back a fixed outcome sequence and records every
/// attempt's identity.
pub struct FakeExtractor {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicU32,
    agents: Mutex<Vec<String>>,
}

impl FakeExtractor {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicU32::new(0),
            agents: Mutex::new(Vec::new()),
        }
    }

    /// Number of extraction attempts observed.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// User agents presented across attempts, in order.
    pub fn agents(&self) -> Vec<String> {
        self.agents.lock().unwrap().clone()
    }
}

/// A minimal successful metadata payload.
pub fn sample_raw_info() -> RawMediaInfo {
    RawMediaInfo {
        title: Some("Example".to_string()),
        duration_seconds: Some(212.0),
        thumbnail_url: Some("https://i.ytimg.com/vi/x/hq.jpg".to_string()),
        streams: vec![
            StreamDescriptor {
                format_id: "140".to_string(),
                container: "m4a".to_string(),
                height_px: None,
                byte_size: Some(500),
                has_video: false,
                has_audio: true,
                url: "https://cdn.example.com/140".to_string(),
            },
            StreamDescriptor {
                format_id: "22".to_string(),
                container: "mp4".to_string(),
                height_px: Some(720),
                byte_size: None,
                has_video: true,
                has_audio: true,
                url: "https://cdn.example.com/22".to_string(),
            },
        ],
        downloaded_path: None,
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    fn name(&self) -> &str {
        "fake"
    }

    async fn extract(
        &self,
        _url: &str,
        config: &ExtractionConfig,
        identity: &RequestIdentity,
    ) -> Result<RawMediaInfo, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.agents.lock().unwrap().push(identity.user_agent.clone());

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Scripted::Success(raw)) => Ok(raw),
            Some(Scripted::DownloadSuccess { filename, bytes }) => {
                let ExtractionMode::Download { output_dir } = &config.mode else {
                    return Err(ExtractError::unknown(
                        "scripted download outcome in a metadata-mode attempt",
                    ));
                };
                let path = output_dir.join(filename);
                std::fs::write(&path, bytes)
                    .map_err(|e| ExtractError::unknown(format!("fake write failed: {e}")))?;
                Ok(RawMediaInfo {
                    downloaded_path: Some(path),
                    ..RawMediaInfo::default()
                })
            }
            Some(Scripted::Blocked(msg)) => Err(ExtractError::blocked(msg)),
            Some(Scripted::NotFound(msg)) => Err(ExtractError::not_found(msg)),
            Some(Scripted::Unavailable(msg)) => Err(ExtractError::unavailable(msg)),
            Some(Scripted::Unknown(msg)) => Err(ExtractError::unknown(msg)),
            None => Err(ExtractError::unknown("fake script exhausted")),
        }
    }
}
