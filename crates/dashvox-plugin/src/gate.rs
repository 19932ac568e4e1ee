//! Eligibility checks deciding whether a reply is spoken.

use dashvox_types::ReplyContent;
use rand::Rng;

/// Probabilistic trigger with a percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerGate {
    probability: u8,
}

impl TriggerGate {
    /// Values above 100 are treated as 100.
    pub fn new(probability: u8) -> Self {
        Self {
            probability: probability.min(100),
        }
    }

    pub fn probability(&self) -> u8 {
        self.probability
    }

    pub fn is_disabled(&self) -> bool {
        self.probability == 0
    }

    /// Draws a uniform integer in `1..=100` and fires when it does not
    /// exceed the probability. Always fires at 100 without drawing.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        match self.probability {
            0 => false,
            100 => true,
            p => rng.gen_range(1..=100u8) <= p,
        }
    }
}

/// Joins every text-bearing part of `reply` and trims the result.
///
/// Returns `None` when the reply has no text parts or the text is blank.
pub fn extract_text(reply: &ReplyContent) -> Option<String> {
    let text = reply.text_parts()?.concat();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
