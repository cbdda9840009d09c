//! Validated store configuration.
//!
//! Collects the table shape, capacity and tiling choices in one place and
//! hands them to [`LazyStore::try_new`].
//!
//! ## Example
//!
//! ```rust
//! use lazystore::builder::LazyStoreBuilder;
//! use lazystore::store::LazyStore;
//! use lazystore::traits::updater_fn;
//!
//! let store: LazyStore<Vec<f64>> = LazyStoreBuilder::new(50_000, 12)
//!     .max_fragment_count(64)
//!     .fragment_size(1_200)
//!     .build(updater_fn(|_: &mut LazyStore<Vec<f64>>, _, _| {}));
//!
//! assert_eq!(store.fragment_col_count(), 12);
//! assert_eq!(store.fragment_row_count(), 100);
//! ```

use crate::error::ConfigError;
use crate::store::{default_tile_dims, LazyStore, DEFAULT_FRAGMENT_SIZE};
use crate::traits::Updater;

/// Default capacity when none is configured.
pub const DEFAULT_MAX_FRAGMENT_COUNT: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tiling {
    /// Derive dimensions from a cell budget.
    Size(i64),
    /// Explicit `(rows, cols)`.
    Dims(i64, i64),
}

/// Builder for [`LazyStore`].
#[derive(Debug, Clone)]
pub struct LazyStoreBuilder {
    row_count: i64,
    column_count: i64,
    max_fragment_count: usize,
    tiling: Tiling,
}

impl LazyStoreBuilder {
    pub fn new(row_count: i64, column_count: i64) -> Self {
        Self {
            row_count,
            column_count,
            max_fragment_count: DEFAULT_MAX_FRAGMENT_COUNT,
            tiling: Tiling::Size(DEFAULT_FRAGMENT_SIZE),
        }
    }

    /// Upper bound on tracked fragments.
    pub fn max_fragment_count(mut self, max_fragment_count: usize) -> Self {
        self.max_fragment_count = max_fragment_count;
        self
    }

    /// Target cells per tile; tiles are at most 25 columns wide.
    pub fn fragment_size(mut self, cells: i64) -> Self {
        self.tiling = Tiling::Size(cells);
        self
    }

    /// Explicit tile dimensions, overriding [`fragment_size`](Self::fragment_size).
    pub fn fragment_dims(mut self, rows: i64, cols: i64) -> Self {
        self.tiling = Tiling::Dims(rows, cols);
        self
    }

    /// Builds the store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a non-positive `fragment_size` and for
    /// anything [`LazyStore::try_new`] rejects.
    pub fn try_build<V, D>(
        self,
        updater: impl Updater<V, D> + 'static,
    ) -> Result<LazyStore<V, D>, ConfigError> {
        let (rows, cols) = match self.tiling {
            Tiling::Size(cells) if cells <= 0 => {
                return Err(ConfigError::new(format!(
                    "fragment_size must be greater than zero, got {}",
                    cells
                )));
            },
            Tiling::Size(cells) => default_tile_dims(self.column_count, cells),
            Tiling::Dims(rows, cols) => (rows, cols),
        };
        LazyStore::try_new(
            self.row_count,
            self.column_count,
            self.max_fragment_count,
            rows,
            cols,
            updater,
        )
    }

    /// Builds the store.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid. See [`try_build`](Self::try_build).
    pub fn build<V, D>(self, updater: impl Updater<V, D> + 'static) -> LazyStore<V, D> {
        match self.try_build(updater) {
            Ok(store) => store,
            Err(e) => panic!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::updater_fn;

    fn try_build(builder: LazyStoreBuilder) -> Result<LazyStore<String>, ConfigError> {
        builder.try_build(updater_fn(|_: &mut LazyStore<String>, _, _| {}))
    }

    #[test]
    fn defaults() {
        let store = try_build(LazyStoreBuilder::new(10_000, 100)).unwrap();
        assert_eq!(store.max_fragment_count(), DEFAULT_MAX_FRAGMENT_COUNT);
        assert_eq!(store.fragment_col_count(), 25);
        assert_eq!(store.fragment_row_count(), 100);
        assert_eq!(store.row_count(), 10_000);
        assert_eq!(store.column_count(), 100);
    }

    #[test]
    fn explicit_dims_override_size() {
        let store = try_build(
            LazyStoreBuilder::new(100, 100)
                .fragment_size(400)
                .fragment_dims(10, 10)
                .max_fragment_count(4),
        )
        .unwrap();
        assert_eq!(store.fragment_row_count(), 10);
        assert_eq!(store.fragment_col_count(), 10);
        assert_eq!(store.fragments_per_row(), 10);
        assert_eq!(store.max_fragment_count(), 4);
    }

    #[test]
    fn rejects_invalid_settings() {
        let err = try_build(LazyStoreBuilder::new(10, 10).fragment_size(0)).unwrap_err();
        assert!(err.message().contains("fragment_size"));
        assert!(try_build(LazyStoreBuilder::new(10, 10).max_fragment_count(0)).is_err());
        assert!(try_build(LazyStoreBuilder::new(10, 10).fragment_dims(0, 5)).is_err());
        assert!(try_build(LazyStoreBuilder::new(-5, 10)).is_err());
    }

    #[test]
    #[should_panic(expected = "column_count")]
    fn build_panics_on_invalid_settings() {
        let _: LazyStore<u8> =
            LazyStoreBuilder::new(10, -1).build(updater_fn(|_: &mut LazyStore<u8>, _, _| {}));
    }
}
