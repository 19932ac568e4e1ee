use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Credential value treated the same as an absent credential.
pub const PLACEHOLDER_API_KEY: &str = "test_key";

pub const DEFAULT_MODEL: &str = "qwen3-tts-flash";
pub const DEFAULT_VOICE: &str = "Cherry";
pub const DEFAULT_LANGUAGE_TYPE: &str = "Auto";
pub const DEFAULT_REALTIME_MODEL: &str = "qwen3-tts-instruct-flash-realtime";
pub const DEFAULT_API_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";
pub const DEFAULT_REALTIME_URL: &str = "wss://dashscope.aliyuncs.com/api-ws/v1/realtime";
pub const DEFAULT_DATA_DIR: &str = "plugin_data/astrbot_plugin_qwen_tts";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_language_type() -> String {
    DEFAULT_LANGUAGE_TYPE.to_string()
}

fn default_realtime_model() -> String {
    DEFAULT_REALTIME_MODEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_realtime_url() -> String {
    DEFAULT_REALTIME_URL.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_cleanup_delay_secs() -> u64 {
    60
}

fn default_stream_timeout_secs() -> u64 {
    60
}

fn default_ffmpeg_binary() -> PathBuf {
    PathBuf::from("ffmpeg")
}

/// How raw PCM from a streaming session is wrapped into a WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuxerKind {
    /// Spawn the external `ffmpeg` binary.
    #[default]
    Ffmpeg,
    /// Write the RIFF header in-process.
    Builtin,
}

/// Settings for one engine instance. Built once at startup and shared
/// read-only afterwards.
#[derive(Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_language_type")]
    pub language_type: String,
    /// Free-text speaking style. Only sent when the model supports it.
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub optimize_instructions: bool,
    /// Keep generated files instead of deleting them after the grace period.
    #[serde(default, alias = "save_audio")]
    pub persist_audio: bool,
    #[serde(default, alias = "stream_mode")]
    pub streaming: bool,
    /// Emit the text part alongside the audio part.
    #[serde(default, alias = "output_both_text_and_audio")]
    pub emit_both: bool,
    #[serde(default = "default_realtime_model")]
    pub realtime_model: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_realtime_url")]
    pub realtime_url: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_cleanup_delay_secs")]
    pub cleanup_delay_secs: u64,
    #[serde(default = "default_stream_timeout_secs")]
    pub stream_timeout_secs: u64,
    #[serde(default)]
    pub muxer: MuxerKind,
    #[serde(default = "default_ffmpeg_binary")]
    pub ffmpeg_binary: PathBuf,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            voice: default_voice(),
            language_type: default_language_type(),
            instructions: String::new(),
            optimize_instructions: false,
            persist_audio: false,
            streaming: false,
            emit_both: false,
            realtime_model: default_realtime_model(),
            api_base_url: default_api_base_url(),
            realtime_url: default_realtime_url(),
            data_dir: default_data_dir(),
            cleanup_delay_secs: default_cleanup_delay_secs(),
            stream_timeout_secs: default_stream_timeout_secs(),
            muxer: MuxerKind::default(),
            ffmpeg_binary: default_ffmpeg_binary(),
        }
    }
}

impl fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("language_type", &self.language_type)
            .field("instructions", &self.instructions)
            .field("optimize_instructions", &self.optimize_instructions)
            .field("persist_audio", &self.persist_audio)
            .field("streaming", &self.streaming)
            .field("emit_both", &self.emit_both)
            .field("realtime_model", &self.realtime_model)
            .field("api_base_url", &self.api_base_url)
            .field("realtime_url", &self.realtime_url)
            .field("data_dir", &self.data_dir)
            .field("cleanup_delay_secs", &self.cleanup_delay_secs)
            .field("stream_timeout_secs", &self.stream_timeout_secs)
            .field("muxer", &self.muxer)
            .field("ffmpeg_binary", &self.ffmpeg_binary)
            .finish()
    }
}

impl SynthesisConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// True when a usable credential is configured. Empty and placeholder
    /// keys both count as absent.
    pub fn has_credential(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != PLACEHOLDER_API_KEY
    }

    /// Whether the configured model accepts `instructions`.
    pub fn supports_instructions(&self) -> bool {
        self.model.to_lowercase().contains("instruct")
    }

    /// Instructions to send with a request-response call, if any.
    pub fn effective_instructions(&self) -> Option<&str> {
        if self.instructions.is_empty() || !self.supports_instructions() {
            None
        } else {
            Some(&self.instructions)
        }
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.cleanup_delay_secs)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }
}
