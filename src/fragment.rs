//! Cache entries.
//!
//! A [`Fragment`] is one tile of the table: its grid number, the [`Region`]
//! it covers, a lifecycle [`FragmentState`] and, once loaded, the payload.
//! Fragments are owned by the store; outside code refers to them through a
//! [`FragmentHandle`].

use std::fmt;

use crate::ds::SlotId;
use crate::region::Region;

/// Lifecycle of a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FragmentState {
    /// Tracked, but no fetch requested yet.
    #[default]
    Unset,
    /// A fetch was requested and has not completed.
    Scheduled,
    /// Holds data. Terminal until evicted or invalidated.
    Loaded,
}

/// Generation-checked reference to a fragment.
///
/// Handles stay valid until the fragment is evicted, invalidated or the
/// store is reset. Using a stale handle is never an error: lookups return
/// `None` and installs are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentHandle {
    pub(crate) slot: SlotId,
    pub(crate) generation: u64,
}

impl FragmentHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A tile of the table.
#[derive(Debug, Clone)]
pub struct Fragment<V> {
    handle: FragmentHandle,
    number: i64,
    region: Region,
    payload: Option<V>,
    state: FragmentState,
}

impl<V> Fragment<V> {
    pub(crate) fn new(handle: FragmentHandle, number: i64, region: Region) -> Self {
        Self {
            handle,
            number,
            region,
            payload: None,
            state: FragmentState::Unset,
        }
    }

    /// Fresh `Unset` fragment for the same tile, under a new generation.
    pub(crate) fn renewed(&self, generation: u64) -> Self {
        Self::new(
            FragmentHandle {
                slot: self.handle.slot,
                generation,
            },
            self.number,
            self.region,
        )
    }

    pub fn handle(&self) -> FragmentHandle {
        self.handle
    }

    /// Row-major tile number.
    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn state(&self) -> FragmentState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == FragmentState::Loaded
    }

    pub fn is_scheduled(&self) -> bool {
        self.state == FragmentState::Scheduled
    }

    /// The loaded data, if any.
    pub fn payload(&self) -> Option<&V> {
        self.payload.as_ref()
    }

    pub(crate) fn mark_scheduled(&mut self) {
        self.state = FragmentState::Scheduled;
    }

    pub(crate) fn load(&mut self, value: V) {
        self.payload = Some(value);
        self.state = FragmentState::Loaded;
    }
}

impl<V> fmt::Display for Fragment<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fragment {} ({:?}) {}", self.number, self.state, self.region)
    }
}
