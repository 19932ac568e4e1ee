//! Output naming, writing, and deferred removal of audio artifacts.

use crate::error::VoiceError;
use chrono::{DateTime, Local};
use dashvox_types::Retention;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which stage produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechSource {
    /// Downloaded from the request-response endpoint.
    Remote,
    /// Assembled from a realtime session.
    Streamed,
    /// Placeholder tone.
    Mock,
}

/// A finished audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub retention: Retention,
    pub source: SpeechSource,
}

/// First 8 hex characters of the SHA-256 of `text`.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(8);
    hex
}

/// File name for an artifact of `text` created at `now`.
///
/// Persistent: `tts_<YYYYmmdd_HHMMSS>_<fp>.wav`. Ephemeral: `temp_<fp>.wav`.
///
/// Ephemeral names depend only on the text. Repeating the same text within
/// the cleanup delay overwrites the earlier file, and the earlier call's
/// scheduled removal then deletes the newer artifact ahead of its own delay.
pub fn artifact_file_name(text: &str, retention: Retention, now: DateTime<Local>) -> String {
    let fp = fingerprint(text);
    match retention {
        Retention::Persistent => format!("tts_{}_{}.wav", now.format("%Y%m%d_%H%M%S"), fp),
        Retention::Ephemeral => format!("temp_{}.wav", fp),
    }
}

/// Creates `dir` and any missing parents.
pub async fn ensure_dir(dir: &Path) -> Result<(), VoiceError> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// Writes `bytes` to `path` verbatim.
pub async fn write_audio(path: &Path, bytes: &[u8]) -> Result<(), VoiceError> {
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Schedules removal of a file at some later time.
///
/// Implementations must return immediately; the removal itself runs
/// detached and its failure is never reported to the caller.
pub trait CleanupScheduler: Send + Sync {
    fn schedule_removal(&self, path: PathBuf, delay: Duration);
}

/// Removes files from a detached tokio task after a delay.
///
/// Must be called from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCleanup;

impl CleanupScheduler for TokioCleanup {
    fn schedule_removal(&self, path: PathBuf, delay: Duration) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "removed ephemeral audio"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "failed to remove ephemeral audio")
                }
            }
        });
    }
}
