//! Messages exchanged between agents, handlers and behaviors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of payload a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Plain text
    Text,
    /// Structured JSON payload
    Structured,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::Text => write!(f, "text"),
            MessageType::Structured => write!(f, "structured"),
        }
    }
}

/// Message payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(Value),
}

/// An immutable message
///
/// Fields are only reachable through accessors, so a message cannot change
/// after it has been constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    kind: MessageType,
    content: MessageContent,
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a text message
    pub fn text(content: impl Into<String>) -> Self {
        Self::build(MessageType::Text, MessageContent::Text(content.into()))
    }

    /// Create a structured message
    pub fn structured(content: Value) -> Self {
        Self::build(MessageType::Structured, MessageContent::Structured(content))
    }

    fn build(kind: MessageType, content: MessageContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Unique ID of this message
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Type of this message
    pub fn kind(&self) -> MessageType {
        self.kind
    }

    /// Payload of this message
    pub fn content(&self) -> &MessageContent {
        &self.content
    }

    /// Text payload, if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Structured(_) => None,
        }
    }

    /// Creation time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.content {
            MessageContent::Text(text) => write!(f, "{}", text),
            MessageContent::Structured(value) => write!(f, "{}", value),
        }
    }
}
