//! Request-response synthesis against the multimodal generation endpoint.
//!
//! A successful call returns a short-lived URL for the rendered audio,
//! which is then downloaded verbatim to the target file. Every remote
//! problem degrades to the mock tone so this path always yields audio
//! unless the local file system fails.

use crate::config::SynthesisConfig;
use crate::error::VoiceError;
use crate::mock;
use crate::persist::{self, SpeechSource};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Path of the generation endpoint below `api_base_url`.
pub const GENERATION_PATH: &str = "/services/aigc/multimodal-generation/generation";

/// HTTP timeout for the generation call and the audio download.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully resolved request for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisRequest {
    pub model: String,
    pub input: SynthesisInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisInput {
    pub text: String,
    pub voice: String,
    pub language_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimize_instructions: Option<bool>,
}

impl SynthesisRequest {
    /// Builds the request for `text`. Instructions are attached only when
    /// the configured model supports them.
    pub fn from_config(config: &SynthesisConfig, text: &str) -> Self {
        let instructions = config.effective_instructions().map(str::to_string);
        let optimize_instructions = instructions.as_ref().map(|_| config.optimize_instructions);
        Self {
            model: config.model.clone(),
            input: SynthesisInput {
                text: text.to_string(),
                voice: config.voice.clone(),
                language_type: config.language_type.clone(),
                instructions,
                optimize_instructions,
            },
        }
    }
}

/// Interpreted reply of the generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteResponse {
    Success { audio_url: String },
    Failure { code: Option<String>, message: String },
    Malformed(String),
}

#[derive(Deserialize)]
struct SuccessBody {
    output: Option<OutputBody>,
}

#[derive(Deserialize)]
struct OutputBody {
    audio: Option<AudioBody>,
}

#[derive(Deserialize)]
struct AudioBody {
    url: Option<String>,
}

#[derive(Deserialize)]
struct FailureBody {
    code: Option<String>,
    message: Option<String>,
}

impl RemoteResponse {
    /// Classifies a raw HTTP status and body.
    pub fn from_payload(status: u16, body: &[u8]) -> Self {
        if !(200..300).contains(&status) {
            let (code, message) = match serde_json::from_slice::<FailureBody>(body) {
                Ok(failure) => (failure.code, failure.message),
                Err(_) => (None, None),
            };
            return Self::Failure {
                code,
                message: message.unwrap_or_else(|| format!("HTTP status {}", status)),
            };
        }

        let parsed: SuccessBody = match serde_json::from_slice(body) {
            Ok(parsed) => parsed,
            Err(e) => return Self::Malformed(format!("invalid JSON: {}", e)),
        };

        match parsed
            .output
            .and_then(|o| o.audio)
            .and_then(|a| a.url)
            .filter(|url| !url.is_empty())
        {
            Some(audio_url) => Self::Success { audio_url },
            None => Self::Malformed("response has no output.audio.url".to_string()),
        }
    }
}

/// Executes request-response synthesis.
#[derive(Debug, Clone)]
pub struct RequestSynthesizer {
    config: Arc<SynthesisConfig>,
    client: reqwest::Client,
}

fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("dashvox/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

impl RequestSynthesizer {
    pub fn new(config: Arc<SynthesisConfig>) -> Self {
        Self {
            config,
            client: build_http_client(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.config.api_base_url.trim_end_matches('/'),
            GENERATION_PATH
        )
    }

    /// Synthesizes `text` into `output`.
    ///
    /// Errors only when the mock fallback itself cannot be written, or when
    /// the downloaded audio cannot be stored.
    pub async fn synthesize(&self, text: &str, output: &Path) -> Result<SpeechSource, VoiceError> {
        if !self.config.has_credential() {
            tracing::warn!("no API key configured, using mock speech");
            return Self::fallback(output).await;
        }

        let request = SynthesisRequest::from_config(&self.config, text);
        let response = match self.call(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "TTS request failed, using mock speech");
                return Self::fallback(output).await;
            }
        };

        match response {
            RemoteResponse::Success { audio_url } => match self.download(&audio_url).await {
                Ok(bytes) => {
                    persist::write_audio(output, &bytes).await?;
                    tracing::info!(path = %output.display(), bytes = bytes.len(), "saved remote speech");
                    Ok(SpeechSource::Remote)
                }
                Err(e) => {
                    tracing::error!(error = %e, url = %audio_url, "audio download failed, using mock speech");
                    Self::fallback(output).await
                }
            },
            RemoteResponse::Failure { code, message } => {
                tracing::error!(
                    code = code.as_deref().unwrap_or("-"),
                    message = %message,
                    "TTS API call failed, using mock speech"
                );
                Self::fallback(output).await
            }
            RemoteResponse::Malformed(reason) => {
                tracing::error!(reason = %reason, "malformed TTS response, using mock speech");
                Self::fallback(output).await
            }
        }
    }

    async fn call(&self, request: &SynthesisRequest) -> Result<RemoteResponse, VoiceError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(RemoteResponse::from_payload(status, &body))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, VoiceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::Remote(format!(
                "audio download returned {}",
                status
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn fallback(output: &Path) -> Result<SpeechSource, VoiceError> {
        mock::write_mock_wav(output).await?;
        Ok(SpeechSource::Mock)
    }
}
