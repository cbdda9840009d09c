pub use crate::assignment::{Assignment, AssignmentId};
pub use crate::builder::LazyStoreBuilder;
pub use crate::error::{ConfigError, InvariantError, StoreError};
pub use crate::fragment::{Fragment, FragmentHandle, FragmentState};
#[cfg(feature = "metrics")]
pub use crate::metrics::StoreMetricsSnapshot;
pub use crate::region::Region;
#[cfg(feature = "concurrency")]
pub use crate::store::SharedLazyStore;
pub use crate::store::{LazyStore, DEFAULT_FRAGMENT_COL_COUNT, DEFAULT_FRAGMENT_SIZE};
pub use crate::traits::{updater_fn, AssignmentTicket, FnUpdater, Updater, WriteOutcome};
