//! Audio format and artifact retention definitions.
//!
//! The realtime synthesis endpoint and the mock synthesizer both produce
//! signed 16-bit little-endian mono PCM at 24 kHz. `PcmFormat` names that
//! layout so the muxers and the WAV writers agree on it.

use serde::{Deserialize, Serialize};

/// Layout of raw PCM samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Samples per second.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Bits per sample (signed integer, little-endian).
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// 16-bit, 24 kHz, mono. The only format the pipeline negotiates.
    pub const S16LE_24K_MONO: Self = Self {
        sample_rate: 24_000,
        channels: 1,
        bits_per_sample: 16,
    };

    /// Bytes occupied by one frame (one sample per channel).
    pub fn frame_bytes(&self) -> usize {
        usize::from(self.channels) * usize::from(self.bits_per_sample / 8)
    }

    /// The ffmpeg `-f` name for this layout.
    pub fn ffmpeg_format(&self) -> &'static str {
        match self.bits_per_sample {
            8 => "u8",
            24 => "s24le",
            32 => "s32le",
            _ => "s16le",
        }
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::S16LE_24K_MONO
    }
}

/// Lifecycle class of a produced audio file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    /// Deleted after a fixed grace period.
    #[default]
    Ephemeral,
    /// Kept indefinitely.
    Persistent,
}

impl Retention {
    pub fn from_persist_flag(persist: bool) -> Self {
        if persist {
            Self::Persistent
        } else {
            Self::Ephemeral
        }
    }
}
