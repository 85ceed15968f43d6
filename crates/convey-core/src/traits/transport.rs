//! Outbound transport contract.

use async_trait::async_trait;

use crate::result::AppResult;

/// Pushes encoded frames onto an already-upgraded socket.
///
/// A frame counts as delivered once `send` returns `Ok`; client
/// acknowledgement is not awaited. Errors must be reported, never
/// swallowed.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Hand one text frame to the socket.
    async fn send(&self, frame: String) -> AppResult<()>;
}
