//! Route definitions for the convey HTTP API.
//!
//! REST routes live under `/api`; the socket route is mounted at the
//! configured stream path.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(conversation_routes())
        .merge(health_routes());

    let ws_routes = Router::new().route(
        &state.config.stream.stream_path,
        get(handlers::ws::ws_upgrade),
    );

    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(request_logging))
        .with_state(state)
}

/// Token issuance and message endpoints.
fn conversation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/conversations/{conversation_id}/stream",
            post(handlers::stream::issue_stream_token),
        )
        .route(
            "/conversations/{conversation_id}/messages",
            get(handlers::messages::get_messages).post(handlers::messages::post_message),
        )
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
