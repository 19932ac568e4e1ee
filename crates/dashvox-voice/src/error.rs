use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Input text is empty")]
    EmptyText,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote synthesis failed: {0}")]
    Remote(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Streaming session failed: {0}")]
    Stream(String),

    #[error("Streaming session produced no audio")]
    NoAudio,

    #[error("Streaming session timed out after {0} seconds")]
    Timeout(u64),

    #[error("Muxing failed: {0}")]
    Mux(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
