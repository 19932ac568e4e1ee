//! dashvox binary - synthesizes one sentence outside of any chat host.
//!
//! Usage: `dashvox [CONFIG.toml] [TEXT...]`. Output is always kept and
//! written to `./test_output`.

use dashvox_plugin::{load_config, PluginError};
use dashvox_voice::{Engine, SynthesisConfig};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_TEXT: &str = "Welcome to DashScope text-to-speech. This is a test sentence.";
const OUTPUT_DIR: &str = "test_output";

/// Splits argv into an optional config path and the text to speak.
fn parse_args(args: Vec<String>) -> (Option<String>, &'static str, String) {
    let mut args = args.into_iter().peekable();

    let mut config_path = None;
    let mut source = "default";
    if let Some(first) = args.next_if(|a| a.ends_with(".toml")) {
        config_path = Some(first);
        source = "cli-arg";
    } else if let Ok(path) = std::env::var("DASHVOX_CONFIG_PATH") {
        if !path.trim().is_empty() {
            config_path = Some(path);
            source = "env-var";
        }
    }

    let text = args.collect::<Vec<_>>().join(" ");
    let text = if text.trim().is_empty() {
        DEFAULT_TEXT.to_string()
    } else {
        text
    };

    (config_path, source, text)
}

async fn run(text: &str, mut synthesis: SynthesisConfig) -> Result<(), PluginError> {
    synthesis.persist_audio = true;
    let engine = Engine::new(synthesis);

    tracing::info!(chars = text.chars().count(), "synthesizing");
    let artifact = engine
        .try_generate_speech(text, Some(Path::new(OUTPUT_DIR)))
        .await?;

    println!("{}", artifact.path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let (resolved_config_path, config_source, text) =
        parse_args(std::env::args().skip(1).collect());
    let selected_config_path = resolved_config_path.as_deref().or(Some("dashvox.toml"));

    let config = match load_config(selected_config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    match run(&text, config.synthesis).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "speech generation failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn config_path_and_text_are_split() {
        let (path, source, text) = parse_args(args(&["my.toml", "hello", "there"]));
        assert_eq!(path.as_deref(), Some("my.toml"));
        assert_eq!(source, "cli-arg");
        assert_eq!(text, "hello there");
    }

    #[test]
    fn missing_text_uses_default_sentence() {
        let (_, _, text) = parse_args(args(&["only.toml"]));
        assert_eq!(text, DEFAULT_TEXT);
    }
}
