//! Error types for the lazystore library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when store configuration parameters are invalid
//!   (e.g. zero capacity, empty tiles, negative dimensions).
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (debug-only `check_invariants`).
//! - [`StoreError`]: Returned when a caller breaks the runtime contract of a
//!   region, assignment or fragment (double install, out-of-range index).
//!
//! ## Example Usage
//!
//! ```
//! use lazystore::builder::LazyStoreBuilder;
//! use lazystore::error::ConfigError;
//! use lazystore::store::LazyStore;
//! use lazystore::traits::updater_fn;
//!
//! let store: Result<LazyStore<Vec<f64>>, ConfigError> = LazyStoreBuilder::new(100, 10)
//!     .max_fragment_count(0)
//!     .try_build(updater_fn(|_: &mut LazyStore<Vec<f64>>, _, _| {}));
//! assert!(store.is_err());
//! ```

use thiserror::Error;

/// Error returned when store configuration parameters are invalid.
///
/// Produced by [`LazyStore::try_new`](crate::store::LazyStore::try_new) and
/// [`LazyStoreBuilder::try_build`](crate::builder::LazyStoreBuilder::try_build).
/// Carries a human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use lazystore::error::ConfigError;
///
/// let err = ConfigError::new("max_fragment_count must be greater than zero");
/// assert!(err.to_string().contains("max_fragment_count"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Error returned when internal store invariants are violated.
///
/// Produced by [`LazyStore::check_invariants`](crate::store::LazyStore::check_invariants).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Runtime contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// `install` was called for a fragment that already holds data.
    #[error("fragment {number} is already loaded")]
    AlreadyLoaded { number: i64 },
    /// A global index lies outside the region it was translated into.
    #[error("index {index} out of bounds")]
    IndexOutOfBounds { index: i64 },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("max_fragment_count must be > 0");
        assert_eq!(err.to_string(), "max_fragment_count must be > 0");
        assert_eq!(err.message(), "max_fragment_count must be > 0");
    }

    #[test]
    fn config_clone_and_eq() {
        let a = ConfigError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("index length mismatch");
        assert_eq!(err.to_string(), "index length mismatch");
        assert!(format!("{:?}", err).contains("index length mismatch"));
    }

    // -- StoreError -------------------------------------------------------

    #[test]
    fn store_error_messages() {
        assert_eq!(
            StoreError::AlreadyLoaded { number: 7 }.to_string(),
            "fragment 7 is already loaded"
        );
        assert_eq!(
            StoreError::IndexOutOfBounds { index: -3 }.to_string(),
            "index -3 out of bounds"
        );
        assert_eq!(
            StoreError::InvalidArgument("data.len".into()).to_string(),
            "invalid argument: data.len"
        );
    }

    #[test]
    fn errors_implement_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<ConfigError>();
        assert_error::<InvariantError>();
        assert_error::<StoreError>();
    }
}
