//! Transport backed by a bounded mpsc queue drained by the socket writer.

use async_trait::async_trait;
use tokio::sync::mpsc;

use convey_core::error::AppError;
use convey_core::result::AppResult;
use convey_core::traits::Transport;

/// Enqueues frames for a socket writer task.
///
/// A frame is delivered once it sits in the queue. When the writer has
/// gone away the queue is closed and `send` fails with a delivery error.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    /// Sender half; the writer task owns the receiver.
    sender: mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Create a transport and the receiver its writer task drains.
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        (Self { sender }, receiver)
    }

    /// Whether the writer side has hung up.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, frame: String) -> AppResult<()> {
        self.sender
            .send(frame)
            .await
            .map_err(|_| AppError::delivery("Socket writer has shut down"))
    }
}
