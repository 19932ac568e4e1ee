use crate::config::{MuxerKind, SynthesisConfig};
use crate::error::VoiceError;
use crate::mock;
use crate::mux::{FfmpegMuxer, PcmMuxer, WavMuxer};
use crate::persist::{self, AudioArtifact, CleanupScheduler, SpeechSource, TokioCleanup};
use crate::request::RequestSynthesizer;
use crate::stream::RealtimeSynthesizer;
use chrono::Local;
use dashvox_types::Retention;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Top-level entry point turning text into an audio file.
///
/// Picks the realtime or request-response path from the configuration,
/// names the output, and schedules removal of ephemeral files.
pub struct Engine {
    config: Arc<SynthesisConfig>,
    request: RequestSynthesizer,
    realtime: RealtimeSynthesizer,
    cleanup: Arc<dyn CleanupScheduler>,
}

fn muxer_for(config: &SynthesisConfig) -> Arc<dyn PcmMuxer> {
    match config.muxer {
        MuxerKind::Ffmpeg => Arc::new(FfmpegMuxer::new(&config.ffmpeg_binary)),
        MuxerKind::Builtin => Arc::new(WavMuxer),
    }
}

impl Engine {
    pub fn new(config: SynthesisConfig) -> Self {
        let config = Arc::new(config);
        Self {
            request: RequestSynthesizer::new(config.clone()),
            realtime: RealtimeSynthesizer::new(config.clone(), muxer_for(&config)),
            cleanup: Arc::new(TokioCleanup),
            config,
        }
    }

    /// Replaces the muxer used for realtime sessions.
    pub fn with_muxer(mut self, muxer: Arc<dyn PcmMuxer>) -> Self {
        self.realtime.set_muxer(muxer);
        self
    }

    /// Replaces the scheduler used to remove ephemeral files.
    pub fn with_cleanup(mut self, cleanup: Arc<dyn CleanupScheduler>) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    fn retention(&self) -> Retention {
        Retention::from_persist_flag(self.config.persist_audio)
    }

    /// Generates speech for `text`, logging and swallowing any failure.
    ///
    /// Writes into `output_dir`, or the configured data directory when
    /// `None`.
    pub async fn generate_speech(&self, text: &str, output_dir: Option<&Path>) -> Option<AudioArtifact> {
        match self.try_generate_speech(text, output_dir).await {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                tracing::error!(error = %e, "speech generation failed");
                None
            }
        }
    }

    /// Generates speech for `text`.
    pub async fn try_generate_speech(
        &self,
        text: &str,
        output_dir: Option<&Path>,
    ) -> Result<AudioArtifact, VoiceError> {
        if text.is_empty() {
            return Err(VoiceError::EmptyText);
        }

        let dir: PathBuf = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.data_dir.clone());
        persist::ensure_dir(&dir).await?;

        let retention = self.retention();
        let path = dir.join(persist::artifact_file_name(text, retention, Local::now()));

        // Staged per call; only renamed over `path` once synthesis succeeds.
        let staging = tempfile::Builder::new()
            .prefix(".partial_")
            .suffix(".wav")
            .tempfile_in(&dir)?
            .into_temp_path();

        let source = if self.config.streaming {
            if self.config.has_credential() {
                self.realtime.synthesize(text, &staging).await?
            } else {
                tracing::warn!("no API key configured, using mock speech");
                mock::write_mock_wav(&staging).await?;
                SpeechSource::Mock
            }
        } else {
            self.request.synthesize(text, &staging).await?
        };

        staging
            .persist(&path)
            .map_err(|e| VoiceError::Io(e.error))?;

        if retention == Retention::Ephemeral {
            self.cleanup
                .schedule_removal(path.clone(), self.config.cleanup_delay());
        }

        tracing::info!(path = %path.display(), ?source, ?retention, "generated speech");
        Ok(AudioArtifact {
            path,
            retention,
            source,
        })
    }
}
