use crate::metrics::cell::MetricsCell;
use crate::metrics::snapshot::StoreMetricsSnapshot;

/// Counters maintained by a [`LazyStore`](crate::store::LazyStore).
#[derive(Debug, Default)]
pub struct StoreMetrics {
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    pub peek_calls: MetricsCell,
    pub peek_hits: MetricsCell,
    pub fragments_created: u64,
    pub fragments_evicted: u64,
    pub fragments_invalidated: u64,
    pub dispatches: u64,
    pub installs: u64,
    pub stale_installs: u64,
    pub assignments_set: u64,
    pub assignments_confirmed: u64,
    pub assignments_failed: u64,
}

impl StoreMetrics {
    pub fn snapshot(
        &self,
        fragment_count: usize,
        scheduled_count: usize,
        max_fragment_count: usize,
    ) -> StoreMetricsSnapshot {
        StoreMetricsSnapshot {
            lookups: self.lookups,
            hits: self.hits,
            misses: self.misses,
            peek_calls: self.peek_calls.get(),
            peek_hits: self.peek_hits.get(),
            fragments_created: self.fragments_created,
            fragments_evicted: self.fragments_evicted,
            fragments_invalidated: self.fragments_invalidated,
            dispatches: self.dispatches,
            installs: self.installs,
            stale_installs: self.stale_installs,
            assignments_set: self.assignments_set,
            assignments_confirmed: self.assignments_confirmed,
            assignments_failed: self.assignments_failed,
            fragment_count,
            scheduled_count,
            max_fragment_count,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
