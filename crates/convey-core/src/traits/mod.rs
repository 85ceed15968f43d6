//! Collaborator traits defined in `convey-core` and implemented by other crates.

pub mod message_store;
pub mod transport;

pub use message_store::{MessageListener, MessageStore, Subscription};
pub use transport::Transport;
