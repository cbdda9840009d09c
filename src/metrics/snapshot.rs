/// Point-in-time copy of a store's counters and gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreMetricsSnapshot {
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    pub peek_calls: u64,
    pub peek_hits: u64,

    pub fragments_created: u64,
    pub fragments_evicted: u64,
    pub fragments_invalidated: u64,

    pub dispatches: u64,
    pub installs: u64,
    pub stale_installs: u64,

    pub assignments_set: u64,
    pub assignments_confirmed: u64,
    pub assignments_failed: u64,

    // gauges captured at snapshot time
    pub fragment_count: usize,
    pub scheduled_count: usize,
    pub max_fragment_count: usize,
}
