//! Application builder: wires router, middleware and state into an Axum app
//! and runs it until shutdown.

use std::future::{Future, IntoFuture};
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use convey_core::error::AppError;
use convey_core::result::AppResult;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Serves the application on `listener` until `shutdown` resolves.
///
/// On shutdown every pending token is dropped and every bound stream is
/// closed, then in-flight HTTP requests get `shutdown_grace_seconds` to
/// finish.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let engine = state.engine.clone();
    let grace = Duration::from_secs(state.config.server.shutdown_grace_seconds);
    let app = build_app(state);

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "convey server listening");
    }

    let (stopping_tx, stopping_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            engine.shutdown().await;
            let _ = stopping_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    let grace_expired = async {
        if stopping_rx.await.is_ok() {
            tokio::time::sleep(grace).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = &mut server => {
            result.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
        }
        _ = grace_expired => {
            warn!(grace_seconds = grace.as_secs(), "Shutdown grace period expired");
        }
    }

    Ok(())
}
