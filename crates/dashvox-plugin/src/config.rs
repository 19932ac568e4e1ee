//! Plugin configuration loading from file and environment variables.

use dashvox_voice::SynthesisConfig;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level plugin configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfig {
    /// Speech synthesis settings, read from the top level of the file.
    #[serde(flatten)]
    pub synthesis: SynthesisConfig,

    /// Percentage of eligible replies converted to speech (0 disables).
    #[serde(default = "default_tts_probability")]
    pub tts_probability: u8,

    /// Replies longer than this many characters stay as text.
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "dashvox_voice=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_tts_probability() -> u8 {
    50
}

fn default_max_text_length() -> usize {
    512
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            synthesis: SynthesisConfig::default(),
            tts_probability: default_tts_probability(),
            max_text_length: default_max_text_length(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `DASHVOX_API_KEY` overrides `api_key`
/// - `DASHSCOPE_API_KEY` is used when `api_key` is still empty
/// - `DASHVOX_MODEL` overrides `model`
/// - `DASHVOX_VOICE` overrides `voice`
/// - `DASHVOX_DATA_DIR` overrides `data_dir`
/// - `DASHVOX_LOG_LEVEL` overrides `logging.level`
/// - `DASHVOX_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<PluginConfig, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => parse_config(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                PluginConfig::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => PluginConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Parses a TOML document and clamps out-of-range values.
pub fn parse_config(contents: &str) -> Result<PluginConfig, ConfigError> {
    let mut config: PluginConfig = toml::from_str(contents)?;
    config.tts_probability = config.tts_probability.min(100);
    Ok(config)
}

/// Applies environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut PluginConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup("DASHVOX_API_KEY").filter(|v| !v.is_empty()) {
        config.synthesis.api_key = key;
    }
    if config.synthesis.api_key.is_empty() {
        if let Some(key) = lookup("DASHSCOPE_API_KEY") {
            config.synthesis.api_key = key;
        }
    }
    if let Some(model) = lookup("DASHVOX_MODEL") {
        config.synthesis.model = model;
    }
    if let Some(voice) = lookup("DASHVOX_VOICE") {
        config.synthesis.voice = voice;
    }
    if let Some(dir) = lookup("DASHVOX_DATA_DIR") {
        config.synthesis.data_dir = PathBuf::from(dir);
    }
    if let Some(level) = lookup("DASHVOX_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("DASHVOX_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
