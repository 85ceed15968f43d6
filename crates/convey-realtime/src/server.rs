//! Top-level stream engine that ties the token registry, message store
//! and stream pool together.

use std::sync::Arc;

use tracing::info;

use convey_core::config::StreamConfig;
use convey_core::error::AppError;
use convey_core::result::AppResult;
use convey_core::traits::{MessageStore, Transport};
use convey_core::types::ConversationId;

use crate::metrics::{EngineMetrics, MetricsSnapshot, delivery};
use crate::stream::handler::ConnectionHandler;
use crate::stream::live::LiveStream;
use crate::stream::pool::StreamPool;
use crate::token::registry::TokenRegistry;
use crate::token::stream_token::StreamToken;

/// Owns every piece of the delivery path for one process.
///
/// Constructed once at startup and handed by reference to the token
/// issuance and socket upgrade endpoints.
#[derive(Debug)]
pub struct StreamEngine {
    /// Pending handlers by token.
    registry: TokenRegistry,
    /// Conversation message store.
    store: Arc<dyn MessageStore>,
    /// Bound streams.
    pool: StreamPool,
    /// Metrics collector.
    metrics: Arc<EngineMetrics>,
    /// Configuration.
    config: StreamConfig,
}

impl StreamEngine {
    /// Creates an engine over `store`.
    pub fn new(config: StreamConfig, store: Arc<dyn MessageStore>) -> Self {
        let metrics = Arc::new(EngineMetrics::new());
        let registry = TokenRegistry::new(config.token_ttl(), metrics.clone())
            .with_live_capacity(config.live_queue_size);

        info!(
            token_ttl_seconds = config.token_ttl_seconds,
            "Stream engine initialized"
        );

        Self {
            registry,
            store,
            pool: StreamPool::new(),
            metrics,
            config,
        }
    }

    /// Issues a one-time token for `conversation_id`, resuming after
    /// `watermark` messages.
    pub fn issue_token(&self, conversation_id: ConversationId, watermark: u64) -> StreamToken {
        self.registry
            .create_resuming(conversation_id, self.store.clone(), watermark)
    }

    /// Consumes a token. Unknown, reused and expired tokens all yield
    /// `TokenNotFound`.
    pub fn resolve(&self, token: &str) -> AppResult<Arc<ConnectionHandler>> {
        self.registry
            .resolve(token)
            .ok_or_else(AppError::token_not_found)
    }

    /// Binds `transport` to a resolved handler and tracks the stream.
    pub async fn open_stream(
        &self,
        handler: Arc<ConnectionHandler>,
        transport: Arc<dyn Transport>,
    ) -> AppResult<LiveStream> {
        let stream = handler.bind(transport).await?;
        self.pool.add(stream.id(), handler);
        delivery::record_open(&self.metrics);
        Ok(stream)
    }

    /// Closes a stream and forgets it. Safe to call more than once.
    pub async fn close_stream(&self, stream: &LiveStream) {
        if self.pool.remove(&stream.id()).is_some() {
            delivery::record_close(&self.metrics);
        }
        stream.handler().close().await;
    }

    /// Drops every pending token and closes every bound stream.
    pub async fn shutdown(&self) {
        info!("Shutting down stream engine");

        let pending = self.registry.clear();
        let streams = self.pool.drain();
        for handler in &streams {
            handler.close().await;
            delivery::record_close(&self.metrics);
        }

        info!(
            pending_tokens = pending,
            streams = streams.len(),
            "Stream engine shut down"
        );
    }

    /// Token registry.
    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Bound streams.
    pub fn pool(&self) -> &StreamPool {
        &self.pool
    }

    /// Message store.
    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Stream configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Metrics snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
