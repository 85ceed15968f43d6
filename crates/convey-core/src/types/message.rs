//! Conversation message model.
//!
//! Channel-specific payload shapes (attachments, channel data) are carried
//! opaquely in [`Message::payload`]; this crate never interprets them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ConversationId;

/// One message in a conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned id, unique within the conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Message type (`"message"`, `"typing"`, `"event"`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,
    /// Sender id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Plain text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Channel-specific payload, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// When the message was produced.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a plain text message with no id yet.
    pub fn text(
        conversation_id: impl Into<ConversationId>,
        from: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            kind: "message".to_string(),
            conversation_id: conversation_id.into(),
            from: Some(from.into()),
            text: Some(text.into()),
            payload: None,
            timestamp: Utc::now(),
        }
    }

    /// Return the message with the given id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Whether this message belongs to `conversation_id`.
    pub fn belongs_to(&self, conversation_id: &ConversationId) -> bool {
        &self.conversation_id == conversation_id
    }
}
