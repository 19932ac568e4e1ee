//! Shared types for the dashvox reply-to-speech plugin.
//!
//! This crate holds the shapes exchanged between the host chat framework and
//! the speech pipeline: the structured reply a bot is about to send, the
//! parts it is made of, and the audio format and retention vocabulary used
//! by the voice crate.
//!
//! Nothing here performs I/O. Both `dashvox-voice` and `dashvox-plugin`
//! depend on this crate, and it depends on neither.

use serde::{Deserialize, Serialize};

pub mod voice;

pub use voice::{PcmFormat, Retention};

/// A single component of an outgoing reply.
///
/// Hosts attach many kinds of components to a message. Only `Plain` carries
/// text that can be spoken; `Record` is the audio attachment installed by
/// the plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyPart {
    /// Plain text.
    Plain { text: String },
    /// A mention of another participant.
    At { target: String },
    /// An image referenced by URL or path.
    Image { url: String },
    /// A voice recording. `file` and `url` are both set to the local path.
    Record { file: String, url: String },
}

impl ReplyPart {
    /// Builds a plain text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    /// Builds a voice recording part pointing at a local file.
    pub fn record(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::Record {
            file: path.clone(),
            url: path,
        }
    }

    /// Returns the text payload, if this part carries one.
    pub fn text_payload(&self) -> Option<&str> {
        match self {
            Self::Plain { text } => Some(text),
            _ => None,
        }
    }
}

/// The structured reply produced by the bot, as an ordered list of parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyContent {
    pub chain: Vec<ReplyPart>,
}

impl ReplyContent {
    pub fn new(chain: Vec<ReplyPart>) -> Self {
        Self { chain }
    }

    /// Convenience constructor for a reply made of a single text part.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![ReplyPart::text(text)])
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Returns the text payloads of every text-bearing part, in order.
    ///
    /// Returns `None` when no part carries text, which callers treat
    /// differently from a reply whose text is present but blank.
    pub fn text_parts(&self) -> Option<Vec<&str>> {
        let parts: Vec<&str> = self
            .chain
            .iter()
            .filter_map(ReplyPart::text_payload)
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts)
        }
    }

    /// Replaces the whole chain.
    pub fn replace(&mut self, chain: Vec<ReplyPart>) {
        self.chain = chain;
    }
}
