//! Token metrics helpers.

use std::sync::atomic::Ordering;

use super::EngineMetrics;

/// Record an issued token
pub fn record_issued(metrics: &EngineMetrics) {
    metrics.tokens_issued.fetch_add(1, Ordering::Relaxed);
}

/// Record a successful resolution
pub fn record_resolved(metrics: &EngineMetrics) {
    metrics.tokens_resolved.fetch_add(1, Ordering::Relaxed);
}

/// Record a rejected resolution (unknown, reused, or expired)
pub fn record_rejected(metrics: &EngineMetrics) {
    metrics.tokens_rejected.fetch_add(1, Ordering::Relaxed);
}

/// Record tokens removed by a sweep
pub fn record_expired(metrics: &EngineMetrics, count: u64) {
    metrics.tokens_expired.fetch_add(count, Ordering::Relaxed);
}
