//! Reply-to-speech plugin for chat bot hosts.
//!
//! Hooks the host's "decorating result" stage: after the bot has produced a
//! text reply and before it is sent, [`TtsPlugin`] may replace the reply
//! with a voice recording of the same text (or append the recording after
//! the text). Replies are skipped when the feature is disabled, when they
//! carry no text, when the text is too long, or when the random trigger
//! does not fire.
//!
//! Speech generation failures never reach the end user. The reply is then
//! delivered unchanged as plain text.

pub mod config;
pub mod gate;

use async_trait::async_trait;
use dashvox_types::{ReplyContent, ReplyPart};
use dashvox_voice::Engine;
use rand::Rng;
use thiserror::Error;

pub use config::{load_config, ConfigError, LoggingConfig, PluginConfig};
pub use gate::{extract_text, TriggerGate};

pub const PLUGIN_NAME: &str = "astrbot_plugin_qwen_tts";
pub const PLUGIN_AUTHOR: &str = "CosyVoice";
pub const PLUGIN_DESCRIPTION: &str = "Qwen text-to-speech replies via Alibaba Cloud DashScope";
pub const PLUGIN_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Voice(#[from] dashvox_voice::VoiceError),
}

/// Host hook invoked once per outgoing reply, before it is sent.
#[async_trait]
pub trait ReplyDecorator: Send + Sync {
    async fn on_decorating_result(&self, reply: &mut ReplyContent);
}

/// Converts eligible text replies into voice recordings.
pub struct TtsPlugin {
    engine: Engine,
    gate: TriggerGate,
    max_text_length: usize,
    emit_both: bool,
}

impl TtsPlugin {
    pub fn new(config: PluginConfig) -> Self {
        let emit_both = config.synthesis.emit_both;
        Self {
            engine: Engine::new(config.synthesis),
            gate: TriggerGate::new(config.tts_probability),
            max_text_length: config.max_text_length,
            emit_both,
        }
    }

    /// Loads the configuration file at `path` (with environment overrides)
    /// and builds the plugin from it.
    pub fn from_config_path(path: Option<&str>) -> Result<Self, PluginError> {
        let config = load_config(path)?;
        Ok(Self::new(config))
    }

    /// Builds a plugin around an existing engine.
    pub fn with_engine(engine: Engine, tts_probability: u8, max_text_length: usize) -> Self {
        let emit_both = engine.config().emit_both;
        Self {
            engine,
            gate: TriggerGate::new(tts_probability),
            max_text_length,
            emit_both,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns the text to speak if `reply` passes every gate.
    pub fn select_text<R: Rng + ?Sized>(&self, reply: &ReplyContent, rng: &mut R) -> Option<String> {
        if self.gate.is_disabled() {
            return None;
        }

        let text = extract_text(reply)?;
        let length = text.chars().count();
        if length > self.max_text_length {
            tracing::debug!(length, max = self.max_text_length, "reply too long for speech");
            return None;
        }

        if !self.gate.sample(rng) {
            tracing::debug!(probability = self.gate.probability(), "speech trigger not drawn");
            return None;
        }

        Some(text)
    }

    /// Runs the gates and, if they pass, replaces the reply with audio.
    ///
    /// Returns whether the reply was rewritten.
    pub async fn convert_text_to_speech(&self, reply: &mut ReplyContent) -> bool {
        let text = {
            let mut rng = rand::thread_rng();
            self.select_text(reply, &mut rng)
        };
        match text {
            Some(text) => self.speak(reply, text).await,
            None => false,
        }
    }

    /// Like [`convert_text_to_speech`](Self::convert_text_to_speech) with a
    /// caller-provided random source.
    pub async fn convert_with_rng<R: Rng + Send>(&self, reply: &mut ReplyContent, rng: &mut R) -> bool {
        match self.select_text(reply, rng) {
            Some(text) => self.speak(reply, text).await,
            None => false,
        }
    }

    async fn speak(&self, reply: &mut ReplyContent, text: String) -> bool {
        let Some(artifact) = self.engine.generate_speech(&text, None).await else {
            return false;
        };

        match tokio::fs::try_exists(&artifact.path).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(path = %artifact.path.display(), "generated audio is missing");
                return false;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to check generated audio");
                return false;
            }
        }

        let record = ReplyPart::record(artifact.path.to_string_lossy().into_owned());
        let chain = if self.emit_both {
            vec![ReplyPart::text(text), record]
        } else {
            vec![record]
        };
        reply.replace(chain);
        true
    }
}

#[async_trait]
impl ReplyDecorator for TtsPlugin {
    async fn on_decorating_result(&self, reply: &mut ReplyContent) {
        self.convert_text_to_speech(reply).await;
    }
}
