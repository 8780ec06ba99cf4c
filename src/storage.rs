use crate::{Timestamp, Value};

/// A storage backend holding one scalar per (counter name, base bucket).
///
/// The engine issues all reads and writes through this trait and never talks
/// to a concrete backend directly. Backends store values durably (or not) at a
/// fixed base resolution; bucket timestamps handed in here are already snapped
/// to bucket boundaries.
///
/// A missing bucket is legitimate "no data", reported as `Ok(None)`, never as
/// an error. Backend failures are propagated to the caller uninterpreted; the
/// engine performs no retries.
pub trait Storage {
    /// Reads the scalar stored for one base bucket, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the backend failed.
    fn get(&self, counter: &str, bucket: Timestamp) -> crate::Result<Option<Value>>;

    /// Atomically adds `delta` to one base bucket, creating it if missing.
    ///
    /// Concurrent `add`s to the same bucket must not lose updates.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unsupported`] if the backend only has
    /// overwrite semantics, or an error if the backend failed.
    fn add(&self, counter: &str, bucket: Timestamp, delta: Value) -> crate::Result<()>;

    /// Overwrites one base bucket, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unsupported`] if the backend only has
    /// increment semantics, or an error if the backend failed.
    fn set(&self, counter: &str, bucket: Timestamp, value: Value) -> crate::Result<()>;

    /// Batched read over an ordered set of base buckets.
    ///
    /// Absent buckets are simply missing from the result map. The provided
    /// implementation falls back to one [`Storage::get`] per bucket; backends
    /// with a cheaper batch read should override it.
    ///
    /// # Errors
    ///
    /// Returns error if the backend failed.
    fn get_range(
        &self,
        counter: &str,
        buckets: &[Timestamp],
    ) -> crate::Result<crate::HashMap<Timestamp, Value>> {
        let mut map =
            crate::HashMap::with_capacity_and_hasher(buckets.len(), rustc_hash::FxBuildHasher);

        for &bucket in buckets {
            if let Some(value) = self.get(counter, bucket)? {
                map.insert(bucket, value);
            }
        }

        Ok(map)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{Aggregation, Counter, CounterName, Error};
    use std::sync::{Arc, Mutex};
    use test_log::test;

    // Overwrite-only backend, e.g. a gauge store without increment semantics.
    struct SetOnly {
        slots: Mutex<crate::HashMap<Timestamp, Value>>,
    }

    impl Storage for SetOnly {
        fn get(&self, _counter: &str, bucket: Timestamp) -> crate::Result<Option<Value>> {
            Ok(self
                .slots
                .lock()
                .expect("lock is poisoned")
                .get(&bucket)
                .copied())
        }

        fn add(&self, _counter: &str, _bucket: Timestamp, _delta: Value) -> crate::Result<()> {
            Err(Error::Unsupported("add"))
        }

        fn set(&self, _counter: &str, bucket: Timestamp, value: Value) -> crate::Result<()> {
            self.slots
                .lock()
                .expect("lock is poisoned")
                .insert(bucket, value);
            Ok(())
        }
    }

    #[test]
    fn unsupported_write_is_surfaced() -> crate::Result<()> {
        let storage = Arc::new(SetOnly {
            slots: Mutex::new(crate::HashMap::default()),
        });

        let counter = Counter::new(CounterName::try_from("a").unwrap(), storage);

        counter.set_at(1_000, 7)?;
        assert_eq!(7, counter.get(1_000)?.value());

        assert!(matches!(
            counter.add_at(1_000, 1),
            Err(Error::Unsupported("add")),
        ));

        Ok(())
    }

    #[test]
    fn default_get_range_falls_back_to_point_reads() -> crate::Result<()> {
        let storage = Arc::new(SetOnly {
            slots: Mutex::new(crate::HashMap::default()),
        });

        storage.set("a", 0, 2)?;
        storage.set("a", 2_000, 5)?;

        let counter = Counter::new(CounterName::try_from("a").unwrap(), storage);

        let series = counter.series(0, 3_000, 1, Aggregation::Sum)?;
        assert_eq!(4, series.len());
        assert_eq!(2, series.first().unwrap().value());
        assert_eq!(Aggregation::None, series.get(1).unwrap().kind());

        Ok(())
    }
}
