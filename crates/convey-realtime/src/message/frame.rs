//! Delivery frame: one batch of messages plus the resume cursor.

use serde::{Deserialize, Serialize};

use convey_core::result::AppResult;
use convey_core::types::Message;

/// A single socket frame.
///
/// Serialized as `{"messages":[...],"watermark":N}`. `watermark` is `null`
/// for bookkeeping pushes that must not move the client's cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryFrame {
    /// Messages in delivery order.
    pub messages: Vec<Message>,
    /// Resume cursor after this batch, if the batch advances it.
    pub watermark: Option<u64>,
}

impl DeliveryFrame {
    /// A frame that advances the cursor to `watermark`.
    pub fn tracked(messages: Vec<Message>, watermark: u64) -> Self {
        Self {
            messages,
            watermark: Some(watermark),
        }
    }

    /// A frame that leaves the cursor untouched.
    pub fn untracked(messages: Vec<Message>) -> Self {
        Self {
            messages,
            watermark: None,
        }
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn encode(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a frame received from a socket.
    pub fn decode(text: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
