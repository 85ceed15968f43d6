//! # convey-api
//!
//! HTTP API layer for convey built on Axum.
//!
//! Provides stream token issuance, the token-gated WebSocket upgrade,
//! message posting and polling against the in-memory store, health, and
//! error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, serve};
pub use error::ApiError;
pub use state::AppState;
