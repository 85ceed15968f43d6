//! Shared domain types.

pub mod id;
pub mod message;

pub use id::{ConversationId, ListenerId, StreamId};
pub use message::Message;
