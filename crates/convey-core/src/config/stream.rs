//! Token issuance and delivery stream configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for stream tokens and the per-socket delivery path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Lifetime of an unresolved stream token in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
    /// Capacity of the bounded outbound frame queue per socket.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// Live messages queued per stream before a lagging stream is closed.
    #[serde(default = "default_live_queue")]
    pub live_queue_size: usize,
    /// Path of the WebSocket endpoint, used to build `stream_url`.
    #[serde(default = "default_stream_path")]
    pub stream_path: String,
}

impl StreamConfig {
    /// Token lifetime as a [`Duration`].
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            token_ttl_seconds: default_token_ttl(),
            outbound_buffer_size: default_outbound_buffer(),
            live_queue_size: default_live_queue(),
            stream_path: default_stream_path(),
        }
    }
}

fn default_token_ttl() -> u64 {
    1800
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_live_queue() -> usize {
    1024
}

fn default_stream_path() -> String {
    "/ws".to_string()
}
