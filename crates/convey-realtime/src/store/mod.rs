//! Listener fan-out and the in-memory message store.

pub mod listeners;
pub mod memory;

pub use listeners::ListenerRegistry;
pub use memory::MemoryMessageStore;
