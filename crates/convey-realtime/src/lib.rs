//! # convey-realtime
//!
//! Real-time delivery path of the convey gateway. Provides:
//!
//! - One-time, time-limited stream tokens ([`TokenRegistry`])
//! - Per-socket connection handlers that replay a conversation's backlog
//!   from a resume watermark and then stream live messages ([`ConnectionHandler`])
//! - A listener registry and an in-memory message store
//! - The JSON delivery frame and an mpsc-backed transport adapter
//! - A [`StreamEngine`] facade with explicit construction and shutdown

pub mod message;
pub mod metrics;
pub mod server;
pub mod store;
pub mod stream;
pub mod token;
pub mod transport;

pub use message::frame::DeliveryFrame;
pub use metrics::EngineMetrics;
pub use server::StreamEngine;
pub use store::memory::MemoryMessageStore;
pub use stream::handler::{ConnectionHandler, HandlerPhase};
pub use stream::live::LiveStream;
pub use token::registry::TokenRegistry;
pub use token::stream_token::StreamToken;
pub use transport::channel::ChannelTransport;
