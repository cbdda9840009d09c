//! The updater seam.
//!
//! The store never talks to the remote data source itself. When work becomes
//! schedulable it calls [`Updater::on_schedule`] once, synchronously, and
//! expects the updater to drain every outstanding request over time:
//!
//! ```text
//!   caller ──get_or_schedule──► LazyStore ──on_schedule──► Updater
//!                                   ▲                         │ fetch / write
//!                                   │                         ▼
//!                                   └──install / confirm── remote source
//! ```
//!
//! An updater may complete work in-line (calling [`LazyStore::install`] on
//! the store it was handed) or later from a task that owns the store. It can
//! pull further work with [`LazyStore::next_scheduled`],
//! [`LazyStore::pending_scheduled`] and [`LazyStore::pending_assignments`].
//!
//! [`LazyStore::install`]: crate::store::LazyStore::install
//! [`LazyStore::next_scheduled`]: crate::store::LazyStore::next_scheduled
//! [`LazyStore::pending_scheduled`]: crate::store::LazyStore::pending_scheduled
//! [`LazyStore::pending_assignments`]: crate::store::LazyStore::pending_assignments

use std::sync::Arc;

use crate::assignment::{Assignment, AssignmentId};
use crate::fragment::FragmentHandle;
use crate::store::LazyStore;

/// A pending write as seen by the updater.
#[derive(Debug)]
pub struct AssignmentTicket<D> {
    id: AssignmentId,
    assignment: Arc<Assignment<D>>,
}

impl<D> AssignmentTicket<D> {
    pub(crate) fn new(id: AssignmentId, assignment: Arc<Assignment<D>>) -> Self {
        Self { id, assignment }
    }

    /// Identity to pass back to [`LazyStore::confirm_assignment`](crate::store::LazyStore::confirm_assignment).
    pub fn id(&self) -> AssignmentId {
        self.id
    }

    pub fn assignment(&self) -> &Assignment<D> {
        &self.assignment
    }

    /// Shared handle to the assignment, for writers that outlive the callback.
    pub fn shared(&self) -> Arc<Assignment<D>> {
        Arc::clone(&self.assignment)
    }
}

impl<D> Clone for AssignmentTicket<D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            assignment: Arc::clone(&self.assignment),
        }
    }
}

/// Result of a remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    Failed(String),
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }
}

/// Collaborator that performs fetches and writes against the remote source.
///
/// `on_schedule` is invoked when the store goes from idle to having pending
/// work. `assignment` is set when the trigger was a write; `fragment` names
/// the tile that triggered the call, if any. The updater must eventually
/// call `install` for every scheduled fragment it serves and
/// `confirm_assignment` for every assignment it writes, in any order.
pub trait Updater<V, D>: Send {
    fn on_schedule(
        &mut self,
        store: &mut LazyStore<V, D>,
        assignment: Option<AssignmentTicket<D>>,
        fragment: Option<FragmentHandle>,
    );
}

impl<V, D> Updater<V, D> for Box<dyn Updater<V, D>> {
    fn on_schedule(
        &mut self,
        store: &mut LazyStore<V, D>,
        assignment: Option<AssignmentTicket<D>>,
        fragment: Option<FragmentHandle>,
    ) {
        (**self).on_schedule(store, assignment, fragment)
    }
}

/// Updater built from a closure. See [`updater_fn`].
pub struct FnUpdater<F>(F);

/// Wraps a closure as an [`Updater`].
///
/// # Example
///
/// ```
/// use lazystore::store::LazyStore;
/// use lazystore::traits::updater_fn;
///
/// // Serves every request in-line with the tile's region length.
/// let mut store: LazyStore<i64> = LazyStore::new(
///     100, 10, 8, 10, 10,
///     updater_fn(|store: &mut LazyStore<i64>, _, _| {
///         while let Some(handle) = store.next_scheduled().map(|f| f.handle()) {
///             let len = store.fragment(handle).map(|f| f.region().length()).unwrap_or(0);
///             let _ = store.install(handle, len);
///         }
///     }),
/// );
///
/// let fragment = store.get_or_schedule(15, 3).unwrap();
/// assert_eq!(fragment.payload(), Some(&100));
/// ```
pub fn updater_fn<V, D, F>(f: F) -> FnUpdater<F>
where
    F: FnMut(&mut LazyStore<V, D>, Option<AssignmentTicket<D>>, Option<FragmentHandle>) + Send,
{
    FnUpdater(f)
}

impl<V, D, F> Updater<V, D> for FnUpdater<F>
where
    F: FnMut(&mut LazyStore<V, D>, Option<AssignmentTicket<D>>, Option<FragmentHandle>) + Send,
{
    fn on_schedule(
        &mut self,
        store: &mut LazyStore<V, D>,
        assignment: Option<AssignmentTicket<D>>,
        fragment: Option<FragmentHandle>,
    ) {
        (self.0)(store, assignment, fragment)
    }
}
