//! Token-gated WebSocket upgrade.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use convey_realtime::{ChannelTransport, ConnectionHandler};

use crate::dto::request::StreamQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /ws?t={token}
///
/// The token is consumed before the upgrade is inspected, so a plain GET
/// with a valid token burns it and gets 400. Unknown, reused and expired
/// tokens get 403.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let handler = state.engine.resolve(&query.t)?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!(
                conversation_id = %handler.conversation_id(),
                "Stream token presented without a WebSocket upgrade"
            );
            return Ok(rejection.into_response());
        }
    };

    Ok(ws
        .on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| handle_stream(state, handler, socket)))
}

/// Drives one bound socket until either side goes away.
async fn handle_stream(state: AppState, handler: Arc<ConnectionHandler>, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (transport, mut outbound_rx) =
        ChannelTransport::new(state.config.stream.outbound_buffer_size);

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(e) = ws_tx.send(Message::Text(frame.into())).await {
                debug!(error = %e, "Socket write failed, stopping writer");
                return;
            }
        }
        if let Err(e) = ws_tx.send(Message::Close(None)).await {
            debug!(error = %e, "Failed to send close frame");
        }
    });

    let conversation_id = handler.conversation_id().clone();
    let mut stream = match state.engine.open_stream(handler, Arc::new(transport)).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(
                conversation_id = %conversation_id,
                error = %e,
                "Failed to open conversation stream"
            );
            // The handler dropped the transport, so the writer drains and closes.
            if let Err(e) = writer.await {
                error!(conversation_id = %conversation_id, error = %e, "Socket writer failed");
            }
            return;
        }
    };

    info!(
        stream_id = %stream.id(),
        conversation_id = %conversation_id,
        "WebSocket connection established"
    );

    loop {
        tokio::select! {
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(stream_id = %stream.id(), error = %e, "WebSocket error");
                    break;
                }
            },
            outcome = stream.finished() => {
                if let Err(e) = outcome {
                    warn!(stream_id = %stream.id(), error = %e, "Live delivery stopped");
                }
                break;
            }
        }
    }

    state.engine.close_stream(&stream).await;
    writer.abort();
    match writer.await {
        Err(e) if e.is_panic() => {
            error!(stream_id = %stream.id(), error = %e, "Socket writer panicked");
        }
        _ => {}
    }

    info!(
        stream_id = %stream.id(),
        conversation_id = %conversation_id,
        watermark = stream.handler().watermark(),
        "WebSocket connection closed"
    );
}

