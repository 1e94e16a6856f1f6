use std::fmt;

use serde::Serialize;

use crate::language::Language;

/// Prefix shared by all welcome message ids.
pub const WELCOME_PREFIX: &str = "welcome-";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        MessageId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_welcome(&self) -> bool {
        self.0.starts_with(WELCOME_PREFIX)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub language: Language,
    /// Milliseconds since the Unix epoch.
    pub timestamp: f64,
    /// Placeholder for a reply that has not arrived yet.
    pub is_loading: bool,
    /// Already handed to text-to-speech (or shown text-only when there is no voice).
    pub is_spoken: bool,
}

impl ChatMessage {
    pub fn new(id: MessageId, sender: Sender, text: impl Into<String>, language: Language, timestamp: f64) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
            language,
            timestamp,
            is_loading: false,
            is_spoken: false,
        }
    }

    pub fn loading(mut self) -> Self {
        self.is_loading = true;
        self
    }

    pub fn spoken(mut self, spoken: bool) -> Self {
        self.is_spoken = spoken;
        self
    }
}

/// Unique, human-readable message ids: `<prefix>-<millis>-<seq>`.
#[derive(Debug, Default)]
pub(crate) struct IdGen {
    seq: u64,
}

impl IdGen {
    pub(crate) fn next(&mut self, prefix: &str, now_ms: f64) -> MessageId {
        self.seq += 1;
        MessageId(format!("{}-{}-{}", prefix, now_ms as u64, self.seq))
    }
}
