//! Stream pool: tracks every handler currently bound to a socket.

use std::sync::Arc;

use dashmap::DashMap;

use convey_core::types::StreamId;

use super::handler::ConnectionHandler;

/// Thread-safe pool of bound streams.
#[derive(Debug, Default)]
pub struct StreamPool {
    /// Stream ID → handler.
    by_id: DashMap<StreamId, Arc<ConnectionHandler>>,
}

impl StreamPool {
    /// Creates a new empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bound stream.
    pub fn add(&self, id: StreamId, handler: Arc<ConnectionHandler>) {
        self.by_id.insert(id, handler);
    }

    /// Removes a stream.
    pub fn remove(&self, id: &StreamId) -> Option<Arc<ConnectionHandler>> {
        self.by_id.remove(id).map(|(_, handler)| handler)
    }

    /// Number of bound streams.
    pub fn stream_count(&self) -> usize {
        self.by_id.len()
    }

    /// Removes and returns every stream.
    pub fn drain(&self) -> Vec<Arc<ConnectionHandler>> {
        let ids: Vec<StreamId> = self.by_id.iter().map(|entry| *entry.key()).collect();
        ids.iter().filter_map(|id| self.remove(id)).collect()
    }
}
