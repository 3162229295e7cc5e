//! Message envelope shared by every Courier agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
        }
    }
}

/// Message payload.
///
/// Only text is routable. Any other payload kind arriving over the wire
/// deserializes to `Unsupported` so handlers can answer it explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
    #[serde(other)]
    Unsupported,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The text payload, if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Unsupported => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Unsupported => "unsupported",
        }
    }
}

/// The request/response unit exchanged between agents.
///
/// Immutable once built. Replies are produced with [`Message::reply`], which
/// links them to the triggering message and its conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    conversation_id: String,
    role: Role,
    content: Content,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Start a new conversation with this message
    pub fn new(content: Content, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id: None,
            conversation_id: Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Content::text(text), Role::User)
    }

    /// Build a reply to `original`: the parent is the original's id and the
    /// conversation id is carried over unchanged.
    pub fn reply(original: &Message, content: Content, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id: Some(original.id.clone()),
            conversation_id: original.conversation_id.clone(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Agent text reply, the shape every Courier agent answers with
    pub fn agent_reply_text(original: &Message, text: impl Into<String>) -> Self {
        Self::reply(original, Content::text(text), Role::Agent)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether this message answers `original`
    pub fn is_reply_to(&self, original: &Message) -> bool {
        self.parent_id.as_deref() == Some(original.id.as_str())
            && self.conversation_id == original.conversation_id
    }
}
