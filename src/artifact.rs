//! Time-boxed lifecycle management for downloaded artifacts.
//!
//! Downloads land in per-request directories under a configured root, so
//! concurrent requests can never collide on a filename. Staging a file
//! starts one detached cleanup timer; after the retention window the file
//! (and its request directory) is deleted best-effort. Deletion is
//! idempotent - a file already removed by anything else is a silent
//! success - and cleanup failures are logged, never surfaced to a request.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default retention window for staged files.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(300);

/// A file under lifecycle management: staged at `created_at`, deleted
/// `retention` later.
#[derive(Debug, Clone)]
pub struct StagedArtifact {
    /// Absolute path of the staged file.
    pub file_path: PathBuf,
    /// When the file was staged.
    pub created_at: SystemTime,
    /// How long the file is retained before deletion.
    pub retention: Duration,
}

/// Owns the temp root and every staged file's cleanup timer.
///
/// The root and retention are explicit construction-time configuration;
/// nothing here reads process-wide defaults.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    retention: Duration,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl ArtifactStore {
    /// Creates a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if the root cannot be created.
    pub fn new(root: impl Into<PathBuf>, retention: Duration) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            retention,
            timers: Mutex::new(Vec::new()),
        })
    }

    /// The configured temp root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocates a fresh collision-free directory for one request's
    /// download. The name is a random token, never derived from the video
    /// title.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if the directory cannot be created.
    pub fn allocate_request_dir(&self) -> io::Result<PathBuf> {
        let dir = self.root.join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "allocated request directory");
        Ok(dir)
    }

    /// Stages a downloaded file: starts its detached cleanup timer and
    /// returns the artifact record. The timer runs independently of the
    /// request that produced the file; the HTTP response can complete long
    /// before it fires. Exactly one deletion attempt fires per staged file.
    pub fn stage(&self, file_path: PathBuf) -> StagedArtifact {
        let artifact = StagedArtifact {
            file_path: file_path.clone(),
            created_at: SystemTime::now(),
            retention: self.retention,
        };

        let retention = self.retention;
        let root = self.root.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            match remove_artifact(&file_path).await {
                Ok(()) => info!(path = %file_path.display(), "cleaned up staged artifact"),
                Err(error) => {
                    // Best-effort only; never escalates past this task.
                    warn!(path = %file_path.display(), %error, "artifact cleanup failed");
                }
            }
            remove_request_dir(&root, &file_path).await;
        });

        if let Ok(mut timers) = self.timers.lock() {
            timers.retain(|t| !t.is_finished());
            timers.push(handle);
        }

        artifact
    }

    /// Removes a request directory whose download never produced a staged
    /// file, along with any partial output inside it. Only direct children
    /// of the root are eligible. Best-effort: an already-missing directory
    /// is a silent success and other failures are logged only.
    pub async fn discard_request_dir(&self, dir: &Path) {
        if dir.parent() != Some(self.root.as_path()) {
            return;
        }
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => debug!(dir = %dir.display(), "discarded request directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                warn!(dir = %dir.display(), %error, "request directory discard failed");
            }
        }
    }

    /// Aborts all outstanding cleanup timers. Called at process teardown so
    /// shutdown does not wait out retention windows; the on-disk root is
    /// reclaimed out of band.
    pub fn shutdown(&self) {
        if let Ok(mut timers) = self.timers.lock() {
            for timer in timers.drain(..) {
                timer.abort();
            }
        }
    }

    /// Number of cleanup timers still pending (testing/diagnostics).
    #[must_use]
    pub fn pending_cleanups(&self) -> usize {
        self.timers
            .lock()
            .map(|timers| timers.iter().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }
}

impl Drop for ArtifactStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Deletes a staged file. Idempotent: a missing file is a success, so a
/// race between the timer and any external deletion is harmless.
///
/// # Errors
///
/// Returns the underlying IO error for failures other than the file
/// already being gone.
pub async fn remove_artifact(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Removes the per-request directory holding `file_path`, if it is a direct
/// child of `root` and now empty. Failures are ignored; a non-empty
/// directory simply outlives its file.
async fn remove_request_dir(root: &Path, file_path: &Path) {
    if let Some(parent) = file_path.parent() {
        if parent.parent() == Some(root) {
            let _ = tokio::fs::remove_dir(parent).await;
        }
    }
}
