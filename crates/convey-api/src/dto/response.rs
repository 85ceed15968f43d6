//! Response DTOs.

use serde::{Deserialize, Serialize};

use convey_core::types::{ConversationId, Message};
use convey_realtime::metrics::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Issued stream token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamTokenResponse {
    /// Conversation the token streams.
    pub conversation_id: ConversationId,
    /// One-time token.
    pub token: String,
    /// Seconds until the token expires if unused.
    pub expires_in: u64,
    /// Relative URL to open the socket with.
    pub stream_url: String,
}

/// Message accepted by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePostedResponse {
    /// Store-assigned id.
    pub id: String,
    /// The stored message.
    pub message: Message,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Tokens issued but not yet resolved.
    pub pending_tokens: usize,
    /// Sockets currently streaming.
    pub active_streams: usize,
    /// Engine counters.
    pub metrics: MetricsSnapshot,
}
