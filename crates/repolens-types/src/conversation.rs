//! Conversation turns as stored per session.
//!
//! A session is an ordered log of [`Turn`]s. The serialized form
//! (`{"type": "human"|"ai", "content": ..., "data"?: ...}`) is exactly what the
//! store's `message` column holds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::llm::Message;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnKind {
    #[serde(rename = "human")]
    Human,
    #[serde(rename = "ai", alias = "assistant")]
    Assistant,
}

impl fmt::Display for TurnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnKind::Human => write!(f, "human"),
            TurnKind::Assistant => write!(f, "ai"),
        }
    }
}

/// One persisted conversation turn. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(rename = "type")]
    pub kind: TurnKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Turn {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            kind: TurnKind::Human,
            content: content.into(),
            data: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            kind: TurnKind::Assistant,
            content: content.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Role-tagged message for the model: Human becomes a user message,
    /// Assistant becomes an assistant message. Metadata is not sent.
    pub fn to_message(&self) -> Message {
        match self.kind {
            TurnKind::Human => Message::user(self.content.clone()),
            TurnKind::Assistant => Message::assistant(self.content.clone()),
        }
    }
}
