//! Wrapping raw PCM into a playable WAV container.

use crate::error::VoiceError;
use crate::mock::write_wav;
use async_trait::async_trait;
use dashvox_types::PcmFormat;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Timeout for the external muxer process.
const MUX_TIMEOUT: Duration = Duration::from_secs(60);

/// Converts a raw PCM file into a WAV file.
#[async_trait]
pub trait PcmMuxer: Send + Sync {
    async fn mux(&self, raw: &Path, wav: &Path, format: PcmFormat) -> Result<(), VoiceError>;
}

/// Runs `ffmpeg` to do the conversion.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    binary: PathBuf,
}

impl FfmpegMuxer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl PcmMuxer for FfmpegMuxer {
    async fn mux(&self, raw: &Path, wav: &Path, format: PcmFormat) -> Result<(), VoiceError> {
        let mut command = Command::new(&self.binary);
        command
            .arg("-y")
            .arg("-f")
            .arg(format.ffmpeg_format())
            .arg("-ar")
            .arg(format.sample_rate.to_string())
            .arg("-ac")
            .arg(format.channels.to_string())
            .arg("-i")
            .arg(raw)
            .arg(wav)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = command
            .spawn()
            .map_err(|e| VoiceError::Mux(format!("Failed to spawn ffmpeg: {}", e)))?;

        let output = tokio::time::timeout(MUX_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Mux(format!(
                    "ffmpeg timed out after {} seconds",
                    MUX_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| VoiceError::Mux(format!("Failed to wait for ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Mux(format!("ffmpeg failed: {}", stderr)));
        }

        Ok(())
    }
}

/// Writes the WAV header in-process.
///
/// Only 16-bit input is supported, and the input must hold whole frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavMuxer;

#[async_trait]
impl PcmMuxer for WavMuxer {
    async fn mux(&self, raw: &Path, wav: &Path, format: PcmFormat) -> Result<(), VoiceError> {
        if format.bits_per_sample != 16 {
            return Err(VoiceError::Mux(format!(
                "unsupported sample width: {} bits",
                format.bits_per_sample
            )));
        }

        let bytes = tokio::fs::read(raw).await?;
        let frame_bytes = format.frame_bytes();
        if bytes.len() % frame_bytes != 0 {
            return Err(VoiceError::Mux(format!(
                "{} bytes of PCM is not a whole number of {}-byte frames",
                bytes.len(),
                frame_bytes
            )));
        }

        let wav = wav.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let samples: Vec<i16> = bytes
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            write_wav(&wav, &samples, format)
        })
        .await
        .map_err(|e| VoiceError::Io(std::io::Error::other(e)))?
    }
}
