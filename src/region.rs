//! Rectangular row/column ranges.
//!
//! A [`Region`] describes `row_count × col_count` cells starting at
//! `(row_begin, col_begin)`. Fragments, assignments and invalidation requests
//! all speak in regions; the store translates them into tile numbers.

use std::fmt;

use crate::error::StoreError;

/// Immutable half-open rectangle `[row_begin, row_end) × [col_begin, col_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    row_begin: i64,
    row_count: i64,
    col_begin: i64,
    col_count: i64,
}

impl Region {
    /// Creates a region.
    ///
    /// # Panics
    ///
    /// Panics if either count is negative. See [`try_new`](Self::try_new).
    pub fn new(row_begin: i64, row_count: i64, col_begin: i64, col_count: i64) -> Self {
        match Self::try_new(row_begin, row_count, col_begin, col_count) {
            Ok(region) => region,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a region, rejecting negative counts.
    pub fn try_new(
        row_begin: i64,
        row_count: i64,
        col_begin: i64,
        col_count: i64,
    ) -> Result<Self, StoreError> {
        if row_count < 0 {
            return Err(StoreError::InvalidArgument(format!(
                "row_count must be >= 0, got {}",
                row_count
            )));
        }
        if col_count < 0 {
            return Err(StoreError::InvalidArgument(format!(
                "col_count must be >= 0, got {}",
                col_count
            )));
        }
        Ok(Self {
            row_begin,
            row_count,
            col_begin,
            col_count,
        })
    }

    /// A region covering exactly one cell.
    pub fn cell(row: i64, col: i64) -> Self {
        Self {
            row_begin: row,
            row_count: 1,
            col_begin: col,
            col_count: 1,
        }
    }

    #[inline]
    pub fn row_begin(&self) -> i64 {
        self.row_begin
    }

    /// Exclusive end row.
    #[inline]
    pub fn row_end(&self) -> i64 {
        self.row_begin.saturating_add(self.row_count)
    }

    #[inline]
    pub fn row_count(&self) -> i64 {
        self.row_count
    }

    #[inline]
    pub fn col_begin(&self) -> i64 {
        self.col_begin
    }

    /// Exclusive end column.
    #[inline]
    pub fn col_end(&self) -> i64 {
        self.col_begin.saturating_add(self.col_count)
    }

    #[inline]
    pub fn col_count(&self) -> i64 {
        self.col_count
    }

    /// Number of cells covered.
    #[inline]
    pub fn length(&self) -> i64 {
        self.row_count.saturating_mul(self.col_count)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Maps a global row index into this region's local row space.
    pub fn to_local_row(&self, row: i64) -> Result<i64, StoreError> {
        if row < self.row_begin || row >= self.row_end() {
            return Err(StoreError::IndexOutOfBounds { index: row });
        }
        Ok(row - self.row_begin)
    }

    /// Maps a global column index into this region's local column space.
    pub fn to_local_col(&self, col: i64) -> Result<i64, StoreError> {
        if col < self.col_begin || col >= self.col_end() {
            return Err(StoreError::IndexOutOfBounds { index: col });
        }
        Ok(col - self.col_begin)
    }

    /// Returns `true` if the cell `(row, col)` lies inside the region.
    pub fn contains(&self, row: i64, col: i64) -> bool {
        row >= self.row_begin
            && row < self.row_end()
            && col >= self.col_begin
            && col < self.col_end()
    }

    /// Returns `true` if both regions share at least one cell.
    pub fn overlaps(&self, other: &Region) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.row_begin < other.row_end()
            && other.row_begin < self.row_end()
            && self.col_begin < other.col_end()
            && other.col_begin < self.col_end()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows={}..{} columns={}..{}",
            self.row_begin,
            self.row_end(),
            self.col_begin,
            self.col_end()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_bounds() {
        let r = Region::new(10, 5, 20, 3);
        assert_eq!(r.row_end(), 15);
        assert_eq!(r.col_end(), 23);
        assert_eq!(r.length(), 15);
        assert!(!r.is_empty());
        assert!(Region::new(0, 0, 0, 4).is_empty());
    }

    #[test]
    fn bounds_saturate_at_i64_max() {
        let r = Region::new(i64::MAX - 1, 10, i64::MAX - 2, 5);
        assert_eq!(r.row_end(), i64::MAX);
        assert_eq!(r.col_end(), i64::MAX);
        assert_eq!(Region::new(0, i64::MAX, 0, 2).length(), i64::MAX);
        assert!(r.contains(i64::MAX - 1, i64::MAX - 2));
    }

    #[test]
    fn negative_counts_rejected() {
        assert!(matches!(
            Region::try_new(0, -1, 0, 1),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(Region::try_new(0, 1, 0, -1).is_err());
    }

    #[test]
    #[should_panic(expected = "row_count")]
    fn new_panics_on_negative_count() {
        let _ = Region::new(0, -2, 0, 1);
    }

    #[test]
    fn local_translation() {
        let r = Region::new(100, 10, 5, 2);
        assert_eq!(r.to_local_row(100), Ok(0));
        assert_eq!(r.to_local_row(109), Ok(9));
        assert_eq!(r.to_local_col(6), Ok(1));
    }

    #[test]
    fn local_translation_out_of_bounds_names_index() {
        let r = Region::new(100, 10, 5, 2);
        assert_eq!(
            r.to_local_row(110),
            Err(StoreError::IndexOutOfBounds { index: 110 })
        );
        assert_eq!(
            r.to_local_row(99),
            Err(StoreError::IndexOutOfBounds { index: 99 })
        );
        assert_eq!(r.to_local_col(7), Err(StoreError::IndexOutOfBounds { index: 7 }));
    }

    #[test]
    fn overlap_is_half_open() {
        let a = Region::new(0, 10, 0, 10);
        assert!(a.overlaps(&Region::new(9, 1, 9, 1)));
        assert!(!a.overlaps(&Region::new(10, 5, 0, 10)));
        assert!(!a.overlaps(&Region::new(0, 10, 10, 1)));
        assert!(!a.overlaps(&Region::new(3, 0, 3, 3)));
        assert!(a.contains(0, 9));
        assert!(!a.contains(0, 10));
    }

    #[test]
    fn display_lists_ranges() {
        assert_eq!(Region::cell(3, 4).to_string(), "rows=3..4 columns=4..5");
    }
}
