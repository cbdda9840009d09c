//! Lazy windowed fragment store.
//!
//! A [`LazyStore`] caches rectangular tiles ("fragments") of a table whose
//! cells live in a slow remote source. Callers ask for the fragment covering a
//! cell; missing fragments are created, marked scheduled, and the
//! [`Updater`] is poked once to go fetch them.
//!
//! ## Architecture
//!
//! ```text
//!   index: Vec<SlotId>  (sorted by tile number, binary searched)
//!   ┌─────┬─────┬─────┬─────┐
//!   │  #0 │  #1 │  #7 │ #12 │
//!   └──┬──┴──┬──┴──┬──┴──┬──┘
//!      │     │     │     │      same SlotIds, different order
//!      ▼     ▼     ▼     ▼
//!   recency: IntrusiveList<Fragment<V>>
//!   front (newest) ─► [#7] ◄──► [#0] ◄──► [#12] ◄──► [#1] ◄── back (evict next)
//!                              ▲
//!                       schedule_next (round-robin cursor)
//! ```
//!
//! Tile numbers are row-major over a grid of
//! `fragment_row_count × fragment_col_count` tiles:
//!
//! ```text
//!   number(row, col) = (row / fragment_row_count) * fragments_per_row
//!                    + (col / fragment_col_count)
//! ```
//!
//! ## Invariants
//! - `index` and `recency` hold exactly the same fragments.
//! - Tile numbers strictly increase along `index`.
//! - `len() <= max_fragment_count()`.
//! - `scheduled_count()` equals the number of scheduled fragments plus the
//!   number of unconfirmed assignments.
//!
//! ## Scheduling
//! The updater is invoked only when the store goes from idle
//! (`scheduled_count == 0`) to busy; it is expected to drain all outstanding
//! work. The store finishes its own bookkeeping before calling out, so an
//! updater may re-enter the store freely. A trigger raised while the updater
//! is running is queued and delivered once the current call returns.
//!
//! ## Example
//!
//! ```
//! use lazystore::store::LazyStore;
//! use lazystore::traits::updater_fn;
//!
//! let mut store: LazyStore<Vec<f64>> =
//!     LazyStore::new(1_000, 40, 16, 100, 20, updater_fn(|_: &mut LazyStore<Vec<f64>>, _, _| {}));
//!
//! // Nothing is loaded yet: the tile is scheduled and `None` comes back.
//! assert!(store.get_or_schedule(250, 30).is_none());
//! assert_eq!(store.scheduled_count(), 1);
//!
//! // Later the fetch completes.
//! let handle = store.next_scheduled().unwrap().handle();
//! store.install(handle, vec![0.0; 2_000]).unwrap();
//! assert!(store.get_if_loaded(250, 30).is_some());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::assignment::{Assignment, AssignmentId};
use crate::ds::{IntrusiveList, SlotId};
use crate::error::{ConfigError, StoreError};
use crate::fragment::{Fragment, FragmentHandle};
#[cfg(feature = "metrics")]
use crate::metrics::{StoreMetrics, StoreMetricsSnapshot};
use crate::region::Region;
use crate::traits::{AssignmentTicket, Updater, WriteOutcome};

/// Target number of cells per tile for the convenience constructors.
pub const DEFAULT_FRAGMENT_SIZE: i64 = 2500;

/// Upper bound on tile width for the convenience constructors.
pub const DEFAULT_FRAGMENT_COL_COUNT: i64 = 25;

/// Tile dimensions `(rows, cols)` for a table with `column_count` columns and
/// a budget of `fragment_size` cells per tile.
///
/// ```
/// use lazystore::store::default_tile_dims;
///
/// assert_eq!(default_tile_dims(100, 2500), (100, 25));
/// assert_eq!(default_tile_dims(4, 2500), (625, 4));
/// assert_eq!(default_tile_dims(0, 2500), (2500, 1));
/// ```
pub fn default_tile_dims(column_count: i64, fragment_size: i64) -> (i64, i64) {
    let cols = column_count.min(DEFAULT_FRAGMENT_COL_COUNT).max(1);
    let rows = (fragment_size / cols).max(1);
    (rows, cols)
}

type Trigger<D> = (Option<AssignmentTicket<D>>, Option<FragmentHandle>);

/// Fragment cache over a `row_count × column_count` table.
///
/// `V` is the payload of a loaded fragment, `D` the element type of
/// assignment data.
pub struct LazyStore<V, D = V> {
    row_count: i64,
    column_count: i64,
    fragment_row_count: i64,
    fragment_col_count: i64,
    fragments_per_row: i64,
    max_fragment_count: usize,

    index: Vec<SlotId>,
    recency: IntrusiveList<Fragment<V>>,
    next_generation: u64,

    scheduled_count: usize,
    schedule_next: Option<SlotId>,

    pending: Vec<(AssignmentId, Arc<Assignment<D>>)>,
    next_assignment_id: u64,

    updater: Option<Box<dyn Updater<V, D>>>,
    deferred: VecDeque<Trigger<D>>,

    #[cfg(feature = "metrics")]
    metrics: StoreMetrics,
}

impl<V, D> LazyStore<V, D> {
    /// Creates a store with explicit tile dimensions.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid. See [`try_new`](Self::try_new).
    pub fn new(
        row_count: i64,
        column_count: i64,
        max_fragment_count: usize,
        fragment_row_count: i64,
        fragment_col_count: i64,
        updater: impl Updater<V, D> + 'static,
    ) -> Self {
        match Self::try_new(
            row_count,
            column_count,
            max_fragment_count,
            fragment_row_count,
            fragment_col_count,
            updater,
        ) {
            Ok(store) => store,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a store with tiles of at most [`DEFAULT_FRAGMENT_COL_COUNT`]
    /// columns holding about [`DEFAULT_FRAGMENT_SIZE`] cells.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn with_default_tiles(
        row_count: i64,
        column_count: i64,
        max_fragment_count: usize,
        updater: impl Updater<V, D> + 'static,
    ) -> Self {
        let (rows, cols) = default_tile_dims(column_count, DEFAULT_FRAGMENT_SIZE);
        Self::new(row_count, column_count, max_fragment_count, rows, cols, updater)
    }

    /// Creates a store, returning an error on invalid configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a dimension is negative, a tile dimension is
    /// not positive, or `max_fragment_count` is zero (a single request needs
    /// room for one tile).
    pub fn try_new(
        row_count: i64,
        column_count: i64,
        max_fragment_count: usize,
        fragment_row_count: i64,
        fragment_col_count: i64,
        updater: impl Updater<V, D> + 'static,
    ) -> Result<Self, ConfigError> {
        if row_count < 0 {
            return Err(ConfigError::new(format!(
                "row_count must be >= 0, got {}",
                row_count
            )));
        }
        if column_count < 0 {
            return Err(ConfigError::new(format!(
                "column_count must be >= 0, got {}",
                column_count
            )));
        }
        if max_fragment_count == 0 {
            return Err(ConfigError::new(
                "max_fragment_count must be greater than zero",
            ));
        }
        if fragment_row_count <= 0 || fragment_col_count <= 0 {
            return Err(ConfigError::new(format!(
                "fragment dimensions must be positive, got {}x{}",
                fragment_row_count, fragment_col_count
            )));
        }

        let fragments_per_row = (column_count / fragment_col_count
            + i64::from(column_count % fragment_col_count != 0))
        .max(1);

        Ok(Self {
            row_count,
            column_count,
            fragment_row_count,
            fragment_col_count,
            fragments_per_row,
            max_fragment_count,
            index: Vec::with_capacity(max_fragment_count.min(16)),
            recency: IntrusiveList::with_capacity(max_fragment_count.min(16)),
            next_generation: 0,
            scheduled_count: 0,
            schedule_next: None,
            pending: Vec::new(),
            next_assignment_id: 0,
            updater: Some(Box::new(updater)),
            deferred: VecDeque::new(),
            #[cfg(feature = "metrics")]
            metrics: StoreMetrics::default(),
        })
    }

    // -----------------------------------------------------------------------
    // Geometry
    // -----------------------------------------------------------------------

    pub fn row_count(&self) -> i64 {
        self.row_count
    }

    pub fn column_count(&self) -> i64 {
        self.column_count
    }

    pub fn fragment_row_count(&self) -> i64 {
        self.fragment_row_count
    }

    pub fn fragment_col_count(&self) -> i64 {
        self.fragment_col_count
    }

    pub fn fragments_per_row(&self) -> i64 {
        self.fragments_per_row
    }

    pub fn max_fragment_count(&self) -> usize {
        self.max_fragment_count
    }

    /// Number of tracked fragments.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Scheduled fragments plus unconfirmed assignments.
    pub fn scheduled_count(&self) -> usize {
        self.scheduled_count
    }

    /// Tile number of the cell `(row, col)`.
    #[inline]
    pub fn fragment_number(&self, row: i64, col: i64) -> i64 {
        (row / self.fragment_row_count) * self.fragments_per_row + col / self.fragment_col_count
    }

    #[inline]
    fn in_bounds(&self, row: i64, col: i64) -> bool {
        row >= 0 && row < self.row_count && col >= 0 && col < self.column_count
    }

    /// Region of tile `number`, clipped to the table.
    fn tile_region(&self, number: i64) -> Region {
        let row_begin = (number / self.fragments_per_row) * self.fragment_row_count;
        let row_end = row_begin
            .saturating_add(self.fragment_row_count)
            .min(self.row_count);
        let col_begin = (number % self.fragments_per_row) * self.fragment_col_count;
        let col_end = col_begin
            .saturating_add(self.fragment_col_count)
            .min(self.column_count);
        Region::new(
            row_begin,
            (row_end - row_begin).max(0),
            col_begin,
            (col_end - col_begin).max(0),
        )
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Returns the fragment covering `(row, col)`, scheduling a fetch if it is
    /// not loaded.
    ///
    /// Returns `None` for cells outside the table and for fragments that are
    /// not loaded once this call returns. The updater is invoked only if the
    /// store was idle; if it fills the fragment synchronously the fragment is
    /// returned.
    pub fn get_or_schedule(&mut self, row: i64, col: i64) -> Option<&Fragment<V>> {
        if !self.in_bounds(row, col) {
            return None;
        }
        #[cfg(feature = "metrics")]
        {
            self.metrics.lookups += 1;
        }

        let number = self.fragment_number(row, col);
        let id = self.touch_or_create(number);
        let (loaded, scheduled, handle) = {
            let fragment = self.recency.get(id)?;
            (fragment.is_loaded(), fragment.is_scheduled(), fragment.handle())
        };
        if loaded {
            #[cfg(feature = "metrics")]
            {
                self.metrics.hits += 1;
            }
            return self.recency.get(id);
        }

        #[cfg(feature = "metrics")]
        {
            self.metrics.misses += 1;
        }
        self.schedule_next = None;
        if scheduled {
            return None;
        }

        if let Some(fragment) = self.recency.get_mut(id) {
            fragment.mark_scheduled();
        }
        self.scheduled_count += 1;
        trace!(number, scheduled = self.scheduled_count, "lazystore.schedule");
        if self.scheduled_count == 1 {
            self.dispatch(None, Some(handle));
        }

        self.fragment(handle).filter(|fragment| fragment.is_loaded())
    }

    /// Returns the fragment covering `(row, col)` if it is loaded.
    ///
    /// Never creates, schedules or reorders fragments.
    pub fn get_if_loaded(&self, row: i64, col: i64) -> Option<&Fragment<V>> {
        if !self.in_bounds(row, col) {
            return None;
        }
        #[cfg(feature = "metrics")]
        self.metrics.peek_calls.incr();

        let number = self.fragment_number(row, col);
        let pos = self.search(number).ok()?;
        let fragment = self.recency.get(self.index[pos])?;
        if !fragment.is_loaded() {
            return None;
        }
        #[cfg(feature = "metrics")]
        self.metrics.peek_hits.incr();
        Some(fragment)
    }

    /// Returns the most recently used loaded fragment, if any.
    pub fn get_any_loaded(&self) -> Option<&Fragment<V>> {
        self.recency.iter().find(|fragment| fragment.is_loaded())
    }

    /// Looks up a fragment by handle; `None` if the handle is stale.
    pub fn fragment(&self, handle: FragmentHandle) -> Option<&Fragment<V>> {
        self.recency
            .get(handle.slot)
            .filter(|fragment| fragment.handle() == handle)
    }

    /// Iterates tracked fragments from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = &Fragment<V>> {
        self.recency.iter()
    }

    fn number_at(&self, id: SlotId) -> i64 {
        self.recency
            .get(id)
            .map_or(i64::MIN, |fragment| fragment.number())
    }

    fn search(&self, number: i64) -> Result<usize, usize> {
        self.index
            .binary_search_by(|id| self.number_at(*id).cmp(&number))
    }

    /// Finds or creates the fragment for `number` and makes it the most
    /// recently used one.
    fn touch_or_create(&mut self, number: i64) -> SlotId {
        if let Some(front) = self.recency.front_id() {
            if self.number_at(front) == number {
                return front;
            }
        }

        if let Ok(pos) = self.search(number) {
            let id = self.index[pos];
            self.recency.move_to_front(id);
            trace!(number, "lazystore.touch");
            return id;
        }

        if self.index.len() >= self.max_fragment_count {
            self.evict_oldest();
        }
        let pos = match self.search(number) {
            Ok(pos) | Err(pos) => pos,
        };

        let generation = self.bump_generation();
        let region = self.tile_region(number);
        let id = self.recency.push_front_with(|slot| {
            Fragment::new(FragmentHandle { slot, generation }, number, region)
        });
        self.index.insert(pos, id);
        #[cfg(feature = "metrics")]
        {
            self.metrics.fragments_created += 1;
        }
        trace!(number, len = self.index.len(), "lazystore.create");
        id
    }

    fn bump_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    /// Drops the least recently used fragment.
    fn evict_oldest(&mut self) {
        let Some(id) = self.recency.back_id() else {
            return;
        };
        let number = self.number_at(id);
        if let Ok(pos) = self.search(number) {
            self.index.remove(pos);
        }
        if self.schedule_next == Some(id) {
            self.schedule_next = self.recency.prev_id(id);
        }
        let Some(fragment) = self.recency.remove(id) else {
            return;
        };
        if fragment.is_scheduled() {
            self.scheduled_count -= 1;
        }
        #[cfg(feature = "metrics")]
        {
            self.metrics.fragments_evicted += 1;
        }
        debug!(
            number,
            state = ?fragment.state(),
            scheduled = self.scheduled_count,
            "lazystore.evict"
        );
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// All scheduled fragments, most recently used first.
    pub fn pending_scheduled(&self) -> Vec<&Fragment<V>> {
        self.recency
            .iter()
            .filter(|fragment| fragment.is_scheduled())
            .collect()
    }

    /// Unconfirmed assignments, oldest first.
    pub fn pending_assignments(&self) -> impl Iterator<Item = AssignmentTicket<D>> + '_ {
        self.pending
            .iter()
            .map(|(id, assignment)| AssignmentTicket::new(*id, Arc::clone(assignment)))
    }

    /// Returns the next scheduled fragment in round-robin order.
    ///
    /// The walk starts just past the fragment returned last and moves toward
    /// older entries, wrapping to the newest end. Repeated calls visit every
    /// scheduled fragment once before repeating.
    pub fn next_scheduled(&mut self) -> Option<&Fragment<V>> {
        if self.scheduled_count == 0 {
            return None;
        }
        let mut cursor = match self.schedule_next {
            Some(id) => self.recency.next_id(id),
            None => self.recency.front_id(),
        };
        for _ in 0..=self.recency.len() {
            let id = match cursor {
                Some(id) => id,
                None => self.recency.front_id()?,
            };
            if self
                .recency
                .get(id)
                .is_some_and(|fragment| fragment.is_scheduled())
            {
                self.schedule_next = Some(id);
                return self.recency.get(id);
            }
            cursor = self.recency.next_id(id);
        }
        None
    }

    /// Stores `value` in the fragment behind `handle`.
    ///
    /// Returns `Ok(false)` if the handle is stale (the fragment was evicted,
    /// invalidated or the store reset); nothing changes in that case.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyLoaded`] if the fragment already holds data.
    pub fn install(&mut self, handle: FragmentHandle, value: V) -> Result<bool, StoreError> {
        let Some(fragment) = self
            .recency
            .get_mut(handle.slot)
            .filter(|fragment| fragment.handle() == handle)
        else {
            #[cfg(feature = "metrics")]
            {
                self.metrics.stale_installs += 1;
            }
            trace!(generation = handle.generation, "lazystore.install.stale");
            return Ok(false);
        };
        if fragment.is_loaded() {
            return Err(StoreError::AlreadyLoaded {
                number: fragment.number(),
            });
        }
        let was_scheduled = fragment.is_scheduled();
        let number = fragment.number();
        fragment.load(value);
        if was_scheduled {
            self.scheduled_count -= 1;
        }
        #[cfg(feature = "metrics")]
        {
            self.metrics.installs += 1;
        }
        trace!(number, scheduled = self.scheduled_count, "lazystore.install");
        Ok(true)
    }

    /// Invokes the updater, or queues the trigger if it is already running.
    fn dispatch(
        &mut self,
        assignment: Option<AssignmentTicket<D>>,
        fragment: Option<FragmentHandle>,
    ) {
        let Some(mut updater) = self.updater.take() else {
            trace!("lazystore.dispatch.deferred");
            self.deferred.push_back((assignment, fragment));
            return;
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut next = Some((assignment, fragment));
            while let Some((assignment, fragment)) = next {
                #[cfg(feature = "metrics")]
                {
                    self.metrics.dispatches += 1;
                }
                debug!(
                    assignment = ?assignment.as_ref().map(|ticket| ticket.id()),
                    generation = ?fragment.map(|handle| handle.generation),
                    scheduled = self.scheduled_count,
                    "lazystore.dispatch"
                );
                updater.on_schedule(self, assignment, fragment);
                next = self.deferred.pop_front();
            }
        }));

        // Restored even on unwind; later triggers need it.
        self.updater = Some(updater);
        if let Err(payload) = result {
            let dropped = self.deferred.len();
            self.deferred.clear();
            warn!(dropped, scheduled = self.scheduled_count, "lazystore.dispatch.panicked");
            panic::resume_unwind(payload);
        }
    }

    // -----------------------------------------------------------------------
    // Invalidation and writes
    // -----------------------------------------------------------------------

    /// Replaces every tracked fragment overlapping `region` with a fresh
    /// `Unset` fragment in the same recency position.
    ///
    /// Returns the first replaced fragment in tile order, or `None` if no
    /// tracked fragment overlaps. Handles to the replaced fragments go stale.
    pub fn clear(&mut self, region: &Region) -> Option<&Fragment<V>> {
        let first = self.invalidate(region)?;
        self.recency.get(first)
    }

    fn invalidate(&mut self, region: &Region) -> Option<SlotId> {
        let overlapping: Vec<SlotId> = self
            .index
            .iter()
            .copied()
            .filter(|id| {
                self.recency
                    .get(*id)
                    .is_some_and(|fragment| fragment.region().overlaps(region))
            })
            .collect();

        let mut first = None;
        for id in overlapping {
            let generation = self.bump_generation();
            let Some(fresh) = self.recency.get(id).map(|old| old.renewed(generation)) else {
                continue;
            };
            if let Some(old) = self.recency.replace(id, fresh) {
                if old.is_scheduled() {
                    self.scheduled_count -= 1;
                }
            }
            #[cfg(feature = "metrics")]
            {
                self.metrics.fragments_invalidated += 1;
            }
            first.get_or_insert(id);
        }
        if first.is_some() {
            debug!(%region, scheduled = self.scheduled_count, "lazystore.invalidate");
        }
        first
    }

    /// Queues a write.
    ///
    /// Every tracked fragment overlapping the assignment is invalidated; the
    /// first of them (in tile order) is immediately rescheduled for reload,
    /// the others are left `Unset` until requested again. The assignment
    /// stays pending until [`confirm_assignment`](Self::confirm_assignment).
    /// The updater is invoked once, with the assignment and the rescheduled
    /// fragment, if the store was idle.
    pub fn set(&mut self, assignment: Assignment<D>) -> AssignmentId {
        let cleared = self.invalidate(assignment.region());
        let was_idle = self.scheduled_count == 0;

        let cleared = cleared.and_then(|id| {
            let fragment = self.recency.get_mut(id)?;
            fragment.mark_scheduled();
            Some(fragment.handle())
        });
        if cleared.is_some() {
            self.scheduled_count += 1;
        }

        let id = AssignmentId(self.next_assignment_id);
        self.next_assignment_id += 1;
        let assignment = Arc::new(assignment);
        self.pending.push((id, Arc::clone(&assignment)));
        self.scheduled_count += 1;
        #[cfg(feature = "metrics")]
        {
            self.metrics.assignments_set += 1;
        }
        debug!(
            %id,
            region = %assignment.region(),
            scheduled = self.scheduled_count,
            "lazystore.set"
        );

        if was_idle {
            self.dispatch(Some(AssignmentTicket::new(id, assignment)), cleared);
        }
        id
    }

    /// Marks a write as finished. Returns `false` if `id` was not pending.
    pub fn confirm_assignment(&mut self, id: AssignmentId, outcome: WriteOutcome) -> bool {
        let Some(pos) = self.pending.iter().position(|(pending, _)| *pending == id) else {
            trace!(%id, "lazystore.confirm.unknown");
            return false;
        };
        self.pending.remove(pos);
        self.scheduled_count -= 1;
        #[cfg(feature = "metrics")]
        {
            self.metrics.assignments_confirmed += 1;
        }
        match outcome {
            WriteOutcome::Applied => {
                debug!(%id, scheduled = self.scheduled_count, "lazystore.confirm");
            },
            WriteOutcome::Failed(reason) => {
                #[cfg(feature = "metrics")]
                {
                    self.metrics.assignments_failed += 1;
                }
                warn!(%id, %reason, "lazystore.confirm.failed");
            },
        }
        true
    }

    /// Drops every fragment and pending assignment.
    ///
    /// A non-negative `new_row_count` replaces the table's row count; pass a
    /// negative value to keep it. Outstanding handles and assignment ids go
    /// stale.
    pub fn reset(&mut self, new_row_count: i64) {
        let dropped = self.index.len();
        self.index.clear();
        self.recency.clear();
        self.scheduled_count = 0;
        self.schedule_next = None;
        self.pending.clear();
        self.deferred.clear();
        if new_row_count >= 0 {
            self.row_count = new_row_count;
        }
        debug!(dropped, row_count = self.row_count, "lazystore.reset");
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> StoreMetricsSnapshot {
        self.metrics
            .snapshot(self.index.len(), self.scheduled_count, self.max_fragment_count)
    }

    #[cfg(feature = "metrics")]
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Validates internal invariants (debug-only).
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), crate::error::InvariantError> {
        use crate::error::InvariantError;

        self.recency.validate_links().map_err(InvariantError::new)?;

        if self.index.len() != self.recency.len() {
            return Err(InvariantError::new(format!(
                "index holds {} fragments but recency list holds {}",
                self.index.len(),
                self.recency.len()
            )));
        }
        if self.index.len() > self.max_fragment_count {
            return Err(InvariantError::new(format!(
                "{} fragments exceed capacity {}",
                self.index.len(),
                self.max_fragment_count
            )));
        }

        let mut prev: Option<i64> = None;
        let mut scheduled = 0usize;
        for &id in &self.index {
            let fragment = self
                .recency
                .get(id)
                .ok_or_else(|| InvariantError::new(format!("index: stale SlotId {:?}", id)))?;
            if prev.is_some_and(|p| p >= fragment.number()) {
                return Err(InvariantError::new(format!(
                    "index not strictly increasing at fragment {}",
                    fragment.number()
                )));
            }
            if fragment.handle().slot != id {
                return Err(InvariantError::new(format!(
                    "fragment {} carries slot {:?} but lives in {:?}",
                    fragment.number(),
                    fragment.handle().slot,
                    id
                )));
            }
            if *fragment.region() != self.tile_region(fragment.number()) {
                return Err(InvariantError::new(format!(
                    "fragment {} covers {} instead of its tile",
                    fragment.number(),
                    fragment.region()
                )));
            }
            if fragment.is_scheduled() {
                scheduled += 1;
            }
            prev = Some(fragment.number());
        }

        if scheduled + self.pending.len() != self.scheduled_count {
            return Err(InvariantError::new(format!(
                "scheduled_count {} != {} scheduled fragments + {} pending assignments",
                self.scheduled_count,
                scheduled,
                self.pending.len()
            )));
        }
        if let Some(cursor) = self.schedule_next {
            if !self.recency.contains(cursor) {
                return Err(InvariantError::new(format!(
                    "schedule cursor points at vacant slot {:?}",
                    cursor
                )));
            }
        }
        Ok(())
    }
}

impl<V, D> fmt::Debug for LazyStore<V, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyStore")
            .field("row_count", &self.row_count)
            .field("column_count", &self.column_count)
            .field("fragment_row_count", &self.fragment_row_count)
            .field("fragment_col_count", &self.fragment_col_count)
            .field("max_fragment_count", &self.max_fragment_count)
            .field("len", &self.index.len())
            .field("scheduled_count", &self.scheduled_count)
            .field("pending_assignments", &self.pending.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SharedLazyStore
// ---------------------------------------------------------------------------

/// Cloneable, lock-protected handle to a [`LazyStore`].
///
/// Lets background workers marshal completed fetches and writes back onto the
/// store. The updater runs while the lock is held and receives the store
/// directly; it must not call back into the same `SharedLazyStore`
/// synchronously.
#[cfg(feature = "concurrency")]
pub struct SharedLazyStore<V, D = V> {
    inner: Arc<parking_lot::Mutex<LazyStore<V, D>>>,
}

#[cfg(feature = "concurrency")]
impl<V, D> SharedLazyStore<V, D> {
    pub fn new(store: LazyStore<V, D>) -> Self {
        Self {
            inner: Arc::new(parking_lot::Mutex::new(store)),
        }
    }

    /// Runs `f` with exclusive access to the store.
    pub fn with<R>(&self, f: impl FnOnce(&mut LazyStore<V, D>) -> R) -> R {
        let mut store = self.inner.lock();
        f(&mut store)
    }

    pub fn install(&self, handle: FragmentHandle, value: V) -> Result<bool, StoreError> {
        self.inner.lock().install(handle, value)
    }

    pub fn confirm_assignment(&self, id: AssignmentId, outcome: WriteOutcome) -> bool {
        self.inner.lock().confirm_assignment(id, outcome)
    }

    pub fn reset(&self, new_row_count: i64) {
        self.inner.lock().reset(new_row_count)
    }

    /// Clones the payload covering `(row, col)` if it is loaded.
    pub fn loaded_payload(&self, row: i64, col: i64) -> Option<V>
    where
        V: Clone,
    {
        let store = self.inner.lock();
        store
            .get_if_loaded(row, col)
            .and_then(|fragment| fragment.payload().cloned())
    }
}

#[cfg(feature = "concurrency")]
impl<V, D> Clone for SharedLazyStore<V, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(feature = "concurrency")]
impl<V, D> fmt::Debug for SharedLazyStore<V, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLazyStore").finish_non_exhaustive()
    }
}
