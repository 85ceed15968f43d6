//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use convey_core::config::AppConfig;
use convey_realtime::{MemoryMessageStore, StreamEngine};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Token registry, stream pool and message store
    pub engine: Arc<StreamEngine>,
    /// Concrete store used by the message endpoints
    pub store: Arc<MemoryMessageStore>,
}

impl AppState {
    /// Builds the state around an in-memory store.
    pub fn new(config: AppConfig) -> Self {
        let store = Arc::new(MemoryMessageStore::new());
        let engine = Arc::new(StreamEngine::new(config.stream.clone(), store.clone()));
        Self {
            config: Arc::new(config),
            engine,
            store,
        }
    }
}
