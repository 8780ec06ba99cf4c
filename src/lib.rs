//! An embeddable time series counter engine.
//!
//! Callers increment (or set) a counter at a given instant; the engine snaps the
//! instant to a bucket at a fixed base resolution (default: 1 second) and hands the
//! write to a storage backend. Reads aggregate ranges of buckets at a chosen
//! granularity (sum, minimum, maximum or truncating average) or fetch the last N
//! buckets as a dense series.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStorage`]: a bounded, concurrency-safe in-process store that keeps
//!   roughly one day of per-second buckets per counter and evicts the oldest
//!   buckets when full.
//! - [`DiskStorage`]: a persistent store built on <https://github.com/fjall-rs/fjall>,
//!   one partition per counter.
//!
//! Any other backend can be plugged in by implementing the [`Storage`] trait
//! (a single scalar keyed by counter name and bucket timestamp).
//!
//! ```
//! use teljari::{Aggregation, CounterFactory, CounterName, MemoryStorage};
//!
//! let factory = CounterFactory::new(MemoryStorage::default());
//! let counter = factory.counter(CounterName::try_from("page.views").unwrap());
//!
//! counter.add(5)?;
//! counter.add(3)?;
//!
//! // one point per one-second bucket, over the last 10 buckets
//! let series = counter.last_n(10, 1, Aggregation::Sum)?;
//! assert_eq!(10, series.len());
//!
//! // both writes landed in the current (partial) bucket
//! let newest = series.last().unwrap();
//! assert_eq!(8, newest.value());
//!
//! # Ok::<(), teljari::Error>(())
//! ```
#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![warn(clippy::result_unit_err)]

mod bounded;
mod bucket;
mod counter;
mod counter_name;
mod disk;
mod duration;
mod error;
mod factory;
mod mem;
mod point;
mod storage;
mod time;

type HashMap<K, V> = std::collections::HashMap<K, V, rustc_hash::FxBuildHasher>;

pub use bounded::{BoundedStore, DEFAULT_MAX_BUCKETS};
pub use bucket::{bucket_start, step_width};
pub use counter::{Counter, DEFAULT_BASE_RESOLUTION_MS};
pub use counter_name::CounterName;
pub use disk::DiskStorage;
pub use duration::Duration;
pub use error::{Error, Result};
pub use factory::CounterFactory;
pub use mem::MemoryStorage;
pub use point::{Aggregation, DataPoint};
pub use storage::Storage;
pub use time::timestamp;

/// UNIX timestamp in milliseconds.
pub type Timestamp = i64;

/// Scalar value stored per bucket.
pub type Value = i64;
