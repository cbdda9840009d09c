//! Store counters (feature `metrics`).
//!
//! Recording is done by the store itself; consumers read a
//! [`StoreMetricsSnapshot`] via
//! [`LazyStore::metrics_snapshot`](crate::store::LazyStore::metrics_snapshot).

pub mod cell;
pub mod metrics_impl;
pub mod snapshot;

pub use metrics_impl::StoreMetrics;
pub use snapshot::StoreMetricsSnapshot;
