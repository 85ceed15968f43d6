//! HTTP and WebSocket request handlers.

pub mod health;
pub mod messages;
pub mod stream;
pub mod ws;
