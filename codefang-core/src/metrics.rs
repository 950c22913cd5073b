//! Observability hooks (SPEC_FULL §2, component K).
//!
//! The core never depends on a concrete metrics backend; it only calls
//! through this trait, the way `drift-analysis` only calls through
//! `tracing` macros and leaves wiring a subscriber to the embedder.

/// Counters/gauges the coordinator and its subsystems report through.
/// All methods have no-op defaults so implementers only override what
/// they care about.
pub trait Metrics: Send + Sync {
    fn cache_hit(&self, _cache: &str) {}
    fn cache_miss(&self, _cache: &str) {}
    fn chunk_started(&self, _chunk_id: usize, _commit_count: usize) {}
    fn chunk_completed(&self, _chunk_id: usize, _elapsed_ms: u64) {}
    fn lane_merge(&self, _batch_id: usize, _analyzer_id: &str, _elapsed_ms: u64) {}
    fn checkpoint_saved(&self, _chunk_id: usize, _bytes: u64) {}
    fn checkpoint_load_failed(&self, _reason: &str) {}
}

/// Default implementation: does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {}

/// Routes every metric event through `tracing` at an appropriate level,
/// so a caller gets observability for free just by installing a
/// subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

impl Metrics for TracingMetrics {
    fn cache_hit(&self, cache: &str) {
        tracing::trace!(cache, "cache hit");
    }

    fn cache_miss(&self, cache: &str) {
        tracing::trace!(cache, "cache miss");
    }

    fn chunk_started(&self, chunk_id: usize, commit_count: usize) {
        tracing::info!(chunk_id, commit_count, "chunk started");
    }

    fn chunk_completed(&self, chunk_id: usize, elapsed_ms: u64) {
        tracing::info!(chunk_id, elapsed_ms, "chunk completed");
    }

    fn lane_merge(&self, batch_id: usize, analyzer_id: &str, elapsed_ms: u64) {
        tracing::debug!(batch_id, analyzer_id, elapsed_ms, "lane merge");
    }

    fn checkpoint_saved(&self, chunk_id: usize, bytes: u64) {
        tracing::info!(chunk_id, bytes, "checkpoint saved");
    }

    fn checkpoint_load_failed(&self, reason: &str) {
        tracing::warn!(reason, "checkpoint load failed, starting fresh");
    }
}
