//! Pending writes.
//!
//! An [`Assignment`] pairs a target [`Region`] with the values to store there.
//! It is consumed by [`LazyStore::set`](crate::store::LazyStore::set), which
//! hands it to the updater and keeps it pending until the write is confirmed.

use std::fmt;

use crate::error::StoreError;
use crate::region::Region;

/// Identity of an assignment accepted by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssignmentId(pub(crate) u64);

impl AssignmentId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "assignment#{}", self.0)
    }
}

/// A write of `data` into `region`, in column-major cell order.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<D> {
    region: Region,
    data: Vec<D>,
}

impl<D> Assignment<D> {
    /// Creates an assignment; `data` must not hold more values than `region` has cells.
    pub fn new(region: Region, data: Vec<D>) -> Result<Self, StoreError> {
        if data.len() as i64 > region.length() {
            return Err(StoreError::InvalidArgument(format!(
                "data.len {} exceeds region length {}",
                data.len(),
                region.length()
            )));
        }
        Ok(Self { region, data })
    }

    /// Single-cell assignment.
    pub fn cell(row: i64, col: i64, value: D) -> Self {
        Self {
            region: Region::cell(row, col),
            data: vec![value],
        }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn data(&self) -> &[D] {
        &self.data
    }

    pub fn into_data(self) -> Vec<D> {
        self.data
    }
}
