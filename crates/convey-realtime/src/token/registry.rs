//! Token registry: single-use, time-boxed table of pending handlers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, warn};

use convey_core::traits::MessageStore;
use convey_core::types::ConversationId;

use crate::metrics::EngineMetrics;
use crate::metrics::tokens;
use crate::stream::handler::{ConnectionHandler, LIVE_QUEUE_CAPACITY};

use super::stream_token::StreamToken;

/// Maps one-time tokens to handlers awaiting a socket.
///
/// Creation, resolution and sweeping are safe to interleave across
/// threads; each touches only the shards it needs.
#[derive(Debug)]
pub struct TokenRegistry {
    /// Token string → pending handler.
    table: DashMap<String, Arc<ConnectionHandler>>,
    /// How long an unresolved token stays valid.
    ttl: TimeDelta,
    /// Live queue bound handed to each handler.
    live_capacity: usize,
    /// Metrics.
    metrics: Arc<EngineMetrics>,
}

impl TokenRegistry {
    /// Creates an empty registry whose tokens live for `ttl`.
    pub fn new(ttl: Duration, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            table: DashMap::new(),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            live_capacity: LIVE_QUEUE_CAPACITY,
            metrics,
        }
    }

    /// Sets the live queue bound of handlers created from now on.
    pub fn with_live_capacity(mut self, capacity: usize) -> Self {
        self.live_capacity = capacity;
        self
    }

    /// Issues a token for a new pending handler starting at watermark 0.
    pub fn create(
        &self,
        conversation_id: ConversationId,
        store: Arc<dyn MessageStore>,
    ) -> StreamToken {
        self.create_resuming(conversation_id, store, 0)
    }

    /// Issues a token for a new pending handler that resumes at `watermark`.
    ///
    /// Runs an expiry sweep before returning.
    pub fn create_resuming(
        &self,
        conversation_id: ConversationId,
        store: Arc<dyn MessageStore>,
        watermark: u64,
    ) -> StreamToken {
        let issued_at = Utc::now();
        let handler = Arc::new(
            ConnectionHandler::new(
                conversation_id.clone(),
                store,
                issued_at,
                watermark,
                self.metrics.clone(),
            )
            .with_live_capacity(self.live_capacity),
        );

        let token = loop {
            let candidate = StreamToken::generate(issued_at);
            match self.table.entry(candidate.as_str().to_string()) {
                Entry::Occupied(_) => {
                    warn!("Stream token collision, regenerating");
                }
                Entry::Vacant(slot) => {
                    slot.insert(handler.clone());
                    break candidate;
                }
            }
        };

        tokens::record_issued(&self.metrics);
        debug!(
            conversation_id = %conversation_id,
            watermark,
            "Stream token issued"
        );

        self.sweep();
        token
    }

    /// Consumes `token`, returning its handler if it was live.
    ///
    /// The entry is removed whether or not it has expired, so a token can
    /// never be resolved twice.
    pub fn resolve(&self, token: &str) -> Option<Arc<ConnectionHandler>> {
        self.resolve_at(token, Utc::now())
    }

    pub(crate) fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Option<Arc<ConnectionHandler>> {
        let Some((_, handler)) = self.table.remove(token) else {
            tokens::record_rejected(&self.metrics);
            debug!("Unknown stream token presented");
            return None;
        };

        if handler.is_expired(now, self.ttl) {
            tokens::record_rejected(&self.metrics);
            info!(
                conversation_id = %handler.conversation_id(),
                "Expired stream token presented"
            );
            return None;
        }

        tokens::record_resolved(&self.metrics);
        Some(handler)
    }

    /// Removes every expired entry. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub(crate) fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.table.len();
        self.table
            .retain(|_, handler| !handler.is_expired(now, self.ttl));
        let removed = before.saturating_sub(self.table.len());

        if removed > 0 {
            tokens::record_expired(&self.metrics, removed as u64);
            debug!(removed, "Expired stream tokens swept");
        }
        removed
    }

    /// Drops every pending handler. Outstanding tokens become unresolvable.
    pub fn clear(&self) -> usize {
        let count = self.table.len();
        self.table.clear();
        count
    }

    /// Number of tokens awaiting resolution.
    pub fn pending_count(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use convey_core::types::Message;

    use super::*;
    use crate::store::memory::MemoryMessageStore;

    fn registry(ttl_secs: u64) -> (TokenRegistry, Arc<MemoryMessageStore>) {
        let registry = TokenRegistry::new(
            Duration::from_secs(ttl_secs),
            Arc::new(EngineMetrics::new()),
        );
        (registry, Arc::new(MemoryMessageStore::new()))
    }

    #[test]
    fn test_resolve_succeeds_exactly_once() {
        let (registry, store) = registry(1800);
        let token = registry.create("c1".into(), store);

        let handler = registry.resolve(token.as_str()).expect("first resolve");
        assert_eq!(handler.conversation_id().as_str(), "c1");
        assert_eq!(handler.date_issued(), token.issued_at());

        assert!(registry.resolve(token.as_str()).is_none());
        assert!(registry.resolve(token.as_str()).is_none());
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_unknown_token_is_not_found() {
        let (registry, _) = registry(1800);
        assert!(registry.resolve("not-a-token").is_none());
        assert_eq!(registry.metrics.snapshot().tokens_rejected, 1);
    }

    #[test]
    fn test_expired_token_is_consumed_without_sweep() {
        let (registry, store) = registry(60);
        let token = registry.create("c1".into(), store);
        let later = token.issued_at() + TimeDelta::seconds(61);

        assert!(registry.resolve_at(token.as_str(), later).is_none());
        // Consumed even though it was rejected.
        assert_eq!(registry.pending_count(), 0);
        assert!(registry.resolve(token.as_str()).is_none());
    }

    #[test]
    fn test_token_valid_at_exact_deadline() {
        let (registry, store) = registry(60);
        let token = registry.create("c1".into(), store);
        let deadline = token.issued_at() + TimeDelta::seconds(60);

        assert!(registry.resolve_at(token.as_str(), deadline).is_some());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (registry, store) = registry(60);
        let token = registry.create("c1".into(), store);

        assert_eq!(registry.sweep_at(token.issued_at() + TimeDelta::seconds(60)), 0);
        assert_eq!(registry.pending_count(), 1);

        assert_eq!(registry.sweep_at(token.issued_at() + TimeDelta::seconds(61)), 1);
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(registry.metrics.snapshot().tokens_expired, 1);
    }

    #[test]
    fn test_create_keeps_live_entries() {
        let (registry, store) = registry(1800);
        registry.create("c1".into(), store.clone());
        registry.create("c1".into(), store);

        assert_eq!(registry.pending_count(), 2);
        assert_eq!(registry.metrics.snapshot().tokens_issued, 2);
    }

    #[test]
    fn test_resuming_handler_keeps_watermark() {
        let (registry, store) = registry(1800);
        store.append(Message::text("c1", "u", "a"));
        let token = registry.create_resuming("c1".into(), store, 7);
        let handler = registry.resolve(token.as_str()).expect("resolve");
        assert_eq!(handler.watermark(), 7);
    }

    #[test]
    fn test_clear_drops_pending() {
        let (registry, store) = registry(1800);
        let token = registry.create("c1".into(), store);
        assert_eq!(registry.clear(), 1);
        assert!(registry.resolve(token.as_str()).is_none());
    }

    #[test]
    fn test_concurrent_resolve_single_winner() {
        let (registry, store) = registry(1800);
        let registry = Arc::new(registry);
        let token = registry.create("c1".into(), store).into_string();

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let token = token.clone();
                std::thread::spawn(move || registry.resolve(&token).is_some())
            })
            .collect();

        let winners = threads
            .into_iter()
            .map(|t| t.join().expect("thread"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_concurrent_create_and_sweep() {
        let (registry, store) = registry(1800);
        let registry = Arc::new(registry);

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let registry = registry.clone();
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| registry.create(format!("c{i}").into(), store.clone()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let issued: Vec<StreamToken> = threads
            .into_iter()
            .flat_map(|t| t.join().expect("thread"))
            .collect();

        assert_eq!(registry.pending_count(), 200);
        assert!(issued.iter().all(|t| registry.resolve(t.as_str()).is_some()));
    }
}
