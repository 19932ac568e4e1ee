//! Realtime synthesis over a duplex websocket session.
//!
//! The session is configured for 16-bit 24 kHz mono PCM, fed the whole
//! text, and told to finish. Audio arrives as base64 `response.audio.delta`
//! frames which are appended in arrival order. A receive task drives a
//! [`StreamingSession`] until it reaches a terminal state and hands it back
//! over a oneshot channel; the caller waits for that under a timeout, then
//! wraps the collected PCM into a WAV file.

use crate::config::SynthesisConfig;
use crate::error::VoiceError;
use crate::mux::PcmMuxer;
use crate::persist::SpeechSource;
use base64::Engine as _;
use dashvox_types::PcmFormat;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::Message;

/// Events sent to the realtime endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionSettings },
    #[serde(rename = "input_text_buffer.append")]
    AppendText { text: String },
    #[serde(rename = "session.finish")]
    Finish,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSettings {
    pub voice: String,
    pub mode: String,
    pub response_format: String,
    pub sample_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl SessionSettings {
    pub fn from_config(config: &SynthesisConfig) -> Self {
        Self {
            voice: config.voice.clone(),
            mode: "server_commit".to_string(),
            response_format: "pcm".to_string(),
            sample_rate: PcmFormat::S16LE_24K_MONO.sample_rate,
            instructions: if config.instructions.is_empty() {
                None
            } else {
                Some(config.instructions.clone())
            },
        }
    }
}

/// Events received from the realtime endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "response.audio.delta")]
    AudioDelta { delta: String },
    #[serde(rename = "session.finished")]
    SessionFinished,
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: Option<ErrorDetail>,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTerminal {
    Complete,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Streaming,
    Terminal(StreamTerminal),
}

/// Accumulated state of one realtime session.
///
/// Exactly one terminal transition is recorded; events after it are ignored.
#[derive(Debug)]
pub struct StreamingSession {
    fragments: Vec<Vec<u8>>,
    state: SessionState,
}

impl Default for StreamingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingSession {
    pub fn new() -> Self {
        Self {
            fragments: Vec::new(),
            state: SessionState::Open,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn terminal(&self) -> Option<&StreamTerminal> {
        match &self.state {
            SessionState::Terminal(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal().is_some()
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// All received PCM, in arrival order.
    pub fn pcm(&self) -> Vec<u8> {
        self.fragments.concat()
    }

    /// Handles one text frame. Frames that are not valid JSON events are
    /// dropped.
    pub fn handle_text(&mut self, raw: &str) {
        match serde_json::from_str::<ServerEvent>(raw) {
            Ok(event) => self.handle_event(event),
            Err(e) => tracing::debug!(error = %e, "dropping undecodable realtime frame"),
        }
    }

    pub fn handle_event(&mut self, event: ServerEvent) {
        if self.is_terminal() {
            return;
        }
        match event {
            ServerEvent::AudioDelta { delta } => {
                match base64::engine::general_purpose::STANDARD.decode(delta.as_bytes()) {
                    Ok(chunk) => {
                        self.fragments.push(chunk);
                        self.state = SessionState::Streaming;
                    }
                    Err(e) => tracing::debug!(error = %e, "dropping malformed audio delta"),
                }
            }
            ServerEvent::SessionFinished => self.finish(StreamTerminal::Complete),
            ServerEvent::Error { error, message } => {
                let message = error
                    .and_then(|e| e.message)
                    .or(message)
                    .unwrap_or_else(|| "unknown error".to_string());
                self.finish(StreamTerminal::Error(message));
            }
            ServerEvent::Other => {}
        }
    }

    /// Handles the connection closing. A close without an error is a normal
    /// completion.
    pub fn handle_close(&mut self, error: Option<String>) {
        match error {
            Some(message) => self.finish(StreamTerminal::Error(message)),
            None => self.finish(StreamTerminal::Complete),
        }
    }

    fn finish(&mut self, terminal: StreamTerminal) {
        if !self.is_terminal() {
            self.state = SessionState::Terminal(terminal);
        }
    }
}

/// Writes the session's PCM to a scratch file next to `output`, muxes it
/// into `output`, and removes the scratch file.
///
/// Sessions without audio produce no file. The result reflects the
/// session's terminal state and the muxing outcome.
pub async fn finalize(
    session: StreamingSession,
    output: &Path,
    muxer: &dyn PcmMuxer,
) -> Result<SpeechSource, VoiceError> {
    let terminal = session
        .terminal()
        .cloned()
        .unwrap_or(StreamTerminal::Error("session did not terminate".to_string()));

    if session.fragment_count() == 0 {
        return match terminal {
            StreamTerminal::Error(message) => Err(VoiceError::Stream(message)),
            StreamTerminal::Complete => Err(VoiceError::NoAudio),
        };
    }

    let pcm = session.pcm();
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let scratch = tokio::task::spawn_blocking(move || {
        let mut file = tempfile::Builder::new()
            .prefix("temp_")
            .suffix(".pcm")
            .tempfile_in(dir)?;
        file.write_all(&pcm)?;
        file.flush()?;
        Ok::<_, std::io::Error>(file.into_temp_path())
    })
    .await
    .map_err(|e| VoiceError::Io(std::io::Error::other(e)))??;

    let muxed = muxer.mux(&scratch, output, PcmFormat::S16LE_24K_MONO).await;

    if let Err(e) = scratch.close() {
        tracing::debug!(error = %e, "failed to remove raw PCM scratch file");
    }
    muxed?;

    match terminal {
        StreamTerminal::Complete => {
            tracing::info!(path = %output.display(), "saved streamed speech");
            Ok(SpeechSource::Streamed)
        }
        StreamTerminal::Error(message) => Err(VoiceError::Stream(message)),
    }
}

/// Drives realtime sessions against the configured endpoint.
pub struct RealtimeSynthesizer {
    config: Arc<SynthesisConfig>,
    muxer: Arc<dyn PcmMuxer>,
}

impl RealtimeSynthesizer {
    pub fn new(config: Arc<SynthesisConfig>, muxer: Arc<dyn PcmMuxer>) -> Self {
        Self { config, muxer }
    }

    pub fn set_muxer(&mut self, muxer: Arc<dyn PcmMuxer>) {
        self.muxer = muxer;
    }

    fn endpoint(&self) -> String {
        let separator = if self.config.realtime_url.contains('?') {
            '&'
        } else {
            '?'
        };
        format!(
            "{}{}model={}",
            self.config.realtime_url, separator, self.config.realtime_model
        )
    }

    /// Synthesizes `text` into `output` over one realtime session.
    pub async fn synthesize(&self, text: &str, output: &Path) -> Result<SpeechSource, VoiceError> {
        let mut request = self.endpoint().into_client_request()?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|e| VoiceError::Config(format!("invalid API key: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        let timeout = self.config.stream_timeout();
        let (socket, _) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| VoiceError::Timeout(timeout.as_secs()))??;
        let (mut writer, mut reader) = socket.split();
        let (done_tx, done_rx) = oneshot::channel();

        let receive_task = tokio::spawn(async move {
            let mut session = StreamingSession::new();
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => session.handle_text(text.as_str()),
                    Ok(Message::Close(frame)) => {
                        let error = frame
                            .filter(|f| f.code != CloseCode::Normal)
                            .map(|f| format!("closed with {}: {}", f.code, f.reason));
                        session.handle_close(error);
                    }
                    Ok(_) => {}
                    Err(e) => session.handle_close(Some(e.to_string())),
                }
                if session.is_terminal() {
                    break;
                }
            }
            session.handle_close(None);
            let _ = done_tx.send(session);
        });

        let events = [
            ClientEvent::SessionUpdate {
                session: SessionSettings::from_config(&self.config),
            },
            ClientEvent::AppendText {
                text: text.to_string(),
            },
            ClientEvent::Finish,
        ];
        for event in &events {
            let payload = serde_json::to_string(event)?;
            if let Err(e) = writer.send(Message::text(payload)).await {
                receive_task.abort();
                return Err(e.into());
            }
        }

        let session = match tokio::time::timeout(timeout, done_rx).await {
            Ok(Ok(session)) => session,
            Ok(Err(_)) => {
                return Err(VoiceError::Stream(
                    "receive task ended without a result".to_string(),
                ))
            }
            Err(_) => {
                receive_task.abort();
                return Err(VoiceError::Timeout(timeout.as_secs()));
            }
        };

        if let Err(e) = writer.close().await {
            tracing::debug!(error = %e, "realtime socket already closed");
        }

        tracing::debug!(
            fragments = session.fragment_count(),
            state = ?session.state(),
            "realtime session ended"
        );
        finalize(session, output, self.muxer.as_ref()).await
    }
}
