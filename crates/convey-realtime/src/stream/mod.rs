//! Conversation streams: handler lifecycle, live pump, and the pool of bound streams.

pub mod handler;
pub mod live;
pub mod pool;

pub use handler::{ConnectionHandler, HandlerPhase};
pub use live::LiveStream;
pub use pool::StreamPool;
