//! Stream engine metrics.

pub mod delivery;
pub mod tokens;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Tokens issued
    pub tokens_issued: AtomicU64,
    /// Tokens resolved into a handler
    pub tokens_resolved: AtomicU64,
    /// Resolution attempts that found nothing usable
    pub tokens_rejected: AtomicU64,
    /// Tokens removed by the expiry sweep
    pub tokens_expired: AtomicU64,
    /// Streams bound to a socket
    pub streams_opened: AtomicU64,
    /// Streams currently bound
    pub streams_active: AtomicU64,
    /// Frames accepted by a transport
    pub frames_sent: AtomicU64,
    /// Messages carried by those frames
    pub messages_delivered: AtomicU64,
    /// Live messages dropped because the backlog already carried them
    pub duplicates_skipped: AtomicU64,
    /// Frames a transport refused
    pub delivery_failures: AtomicU64,
}

impl EngineMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tokens_issued: self.tokens_issued.load(Ordering::Relaxed),
            tokens_resolved: self.tokens_resolved.load(Ordering::Relaxed),
            tokens_rejected: self.tokens_rejected.load(Ordering::Relaxed),
            tokens_expired: self.tokens_expired.load(Ordering::Relaxed),
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
            streams_active: self.streams_active.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Tokens issued
    pub tokens_issued: u64,
    /// Tokens resolved into a handler
    pub tokens_resolved: u64,
    /// Resolution attempts rejected
    pub tokens_rejected: u64,
    /// Tokens removed by sweep
    pub tokens_expired: u64,
    /// Streams ever bound
    pub streams_opened: u64,
    /// Streams currently bound
    pub streams_active: u64,
    /// Frames sent
    pub frames_sent: u64,
    /// Messages delivered
    pub messages_delivered: u64,
    /// Duplicates skipped
    pub duplicates_skipped: u64,
    /// Delivery failures
    pub delivery_failures: u64,
}
