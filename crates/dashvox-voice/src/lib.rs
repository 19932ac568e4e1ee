//! Speech generation pipeline for the dashvox plugin.
//!
//! Turns one short piece of text into a WAV file using the DashScope
//! text-to-speech service, either through a single request-response call
//! or through a realtime websocket session. When no credential is
//! configured, or the remote call fails, a placeholder tone is written
//! instead so callers nearly always get something playable.
//!
//! The [`Engine`] is the entry point. It names output files after a
//! fingerprint of the text, and removes non-persistent files after a
//! grace period.

pub mod config;
pub mod engine;
pub mod error;
pub mod mock;
pub mod mux;
pub mod persist;
pub mod request;
pub mod stream;

pub use config::{MuxerKind, SynthesisConfig, PLACEHOLDER_API_KEY};
pub use engine::Engine;
pub use error::VoiceError;
pub use mux::{FfmpegMuxer, PcmMuxer, WavMuxer};
pub use persist::{AudioArtifact, CleanupScheduler, SpeechSource, TokioCleanup};
pub use request::{RemoteResponse, RequestSynthesizer, SynthesisRequest};
pub use stream::{RealtimeSynthesizer, StreamTerminal, StreamingSession};
