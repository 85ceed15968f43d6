//! Request DTOs with validation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use convey_core::types::{ConversationId, Message};

/// Query for token issuance and message polling.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct WatermarkQuery {
    /// Messages the client has already seen. Capped at 2^53 - 1, the
    /// largest integer a JSON client holds exactly.
    #[serde(default)]
    #[validate(range(max = 9007199254740991u64, message = "Watermark is out of range"))]
    pub watermark: Option<u64>,
}

/// Query carrying the one-time stream token on upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamQuery {
    /// Stream token.
    pub t: String,
}

/// Post message request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PostMessageRequest {
    /// Message type.
    #[serde(rename = "type", default = "default_kind")]
    #[validate(length(min = 1, max = 64, message = "Message type must be 1-64 characters"))]
    pub kind: String,
    /// Sender id.
    #[validate(length(max = 256))]
    pub from: Option<String>,
    /// Text body.
    pub text: Option<String>,
    /// Channel-specific payload.
    pub payload: Option<serde_json::Value>,
}

impl PostMessageRequest {
    /// Converts the request into a store message for `conversation_id`.
    pub fn into_message(self, conversation_id: ConversationId) -> Message {
        Message {
            id: None,
            kind: self.kind,
            conversation_id,
            from: self.from,
            text: self.text,
            payload: self.payload,
            timestamp: Utc::now(),
        }
    }
}

fn default_kind() -> String {
    "message".to_string()
}

