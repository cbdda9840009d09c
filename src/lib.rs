//! lazystore: a lazy, windowed fragment cache for large remote tables.
//!
//! A table of `rows × columns` cells lives in a slow remote source. The
//! [`LazyStore`](store::LazyStore) partitions it into fixed-size tiles,
//! keeps a bounded number of them in memory (least recently used first out),
//! and asks an [`Updater`](traits::Updater) to fetch tiles and write back
//! edits. See `DESIGN.md` for internal architecture and invariants.

pub mod assignment;
pub mod builder;
pub mod ds;
pub mod error;
pub mod fragment;
pub mod region;
pub mod store;
pub mod traits;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
