//! Stream and delivery metrics helpers.

use std::sync::atomic::Ordering;

use super::EngineMetrics;

/// Record a newly bound stream
pub fn record_open(metrics: &EngineMetrics) {
    metrics.streams_opened.fetch_add(1, Ordering::Relaxed);
    metrics.streams_active.fetch_add(1, Ordering::Relaxed);
}

/// Record a stream leaving the pool
pub fn record_close(metrics: &EngineMetrics) {
    // Stops at zero.
    let _ = metrics
        .streams_active
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
}

/// Record a frame accepted by the transport
pub fn record_frame(metrics: &EngineMetrics, message_count: u64) {
    metrics.frames_sent.fetch_add(1, Ordering::Relaxed);
    metrics
        .messages_delivered
        .fetch_add(message_count, Ordering::Relaxed);
}

/// Record a live duplicate dropped after replay
pub fn record_duplicate(metrics: &EngineMetrics) {
    metrics.duplicates_skipped.fetch_add(1, Ordering::Relaxed);
}

/// Record a frame the transport refused
pub fn record_failure(metrics: &EngineMetrics) {
    metrics.delivery_failures.fetch_add(1, Ordering::Relaxed);
}
