//! Handle to a bound stream and its live pump task.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::error;

use convey_core::error::AppError;
use convey_core::result::AppResult;
use convey_core::types::StreamId;

use super::handler::ConnectionHandler;

/// A handler that has a socket, plus the task pushing live messages to it.
///
/// The pump runs detached; [`LiveStream::finished`] is how its outcome
/// (delivery failure or panic) reaches whoever owns the socket.
#[derive(Debug)]
pub struct LiveStream {
    /// Stream ID.
    id: StreamId,
    /// Bound handler.
    handler: Arc<ConnectionHandler>,
    /// Live pump; `None` once its outcome was taken.
    pump: Option<JoinHandle<AppResult<()>>>,
}

impl LiveStream {
    pub(crate) fn new(
        id: StreamId,
        handler: Arc<ConnectionHandler>,
        pump: JoinHandle<AppResult<()>>,
    ) -> Self {
        Self {
            id,
            handler,
            pump: Some(pump),
        }
    }

    /// Stream ID.
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// The bound handler.
    pub fn handler(&self) -> &Arc<ConnectionHandler> {
        &self.handler
    }

    /// Waits for the live pump to end and reports how it ended.
    ///
    /// Cancel-safe: dropping the future leaves the pump running and a
    /// later call waits again. After the outcome is taken, returns `Ok`.
    pub async fn finished(&mut self) -> AppResult<()> {
        let Some(pump) = self.pump.as_mut() else {
            return Ok(());
        };

        let outcome = pump.await;
        self.pump = None;

        match outcome {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => {
                error!(
                    stream_id = %self.id,
                    conversation_id = %self.handler.conversation_id(),
                    error = %e,
                    "Live pump panicked"
                );
                self.handler.close().await;
                Err(AppError::internal(format!("Live pump panicked: {e}")))
            }
        }
    }
}
