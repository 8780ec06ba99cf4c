use crate::bounded::{BoundedStore, DEFAULT_MAX_BUCKETS};
use crate::storage::Storage;
use crate::{Timestamp, Value};
use std::sync::{Arc, RwLock};

/// In-memory storage backend.
///
/// Keeps one [`BoundedStore`] per counter, created lazily on first write.
/// Nothing is persisted; historical data is capped per counter by the
/// configured bucket capacity (default: ~1 day of one-second buckets).
pub struct MemoryStorage {
    counters: RwLock<crate::HashMap<String, Arc<BoundedStore>>>,
    max_buckets: usize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_BUCKETS)
    }
}

impl MemoryStorage {
    /// Creates an in-memory backend holding at most `max_buckets` buckets per
    /// counter.
    #[must_use]
    pub fn with_capacity(max_buckets: usize) -> Self {
        Self {
            counters: RwLock::default(),
            max_buckets,
        }
    }

    fn store(&self, counter: &str) -> Arc<BoundedStore> {
        if let Some(store) = self
            .counters
            .read()
            .expect("lock is poisoned")
            .get(counter)
        {
            return store.clone();
        }

        let mut lock = self.counters.write().expect("lock is poisoned");

        lock.entry(counter.to_string())
            .or_insert_with(|| {
                log::trace!("creating in-memory store for counter {counter:?}");
                Arc::new(BoundedStore::new(self.max_buckets))
            })
            .clone()
    }

    fn existing_store(&self, counter: &str) -> Option<Arc<BoundedStore>> {
        self.counters
            .read()
            .expect("lock is poisoned")
            .get(counter)
            .cloned()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, counter: &str, bucket: Timestamp) -> crate::Result<Option<Value>> {
        Ok(self
            .existing_store(counter)
            .and_then(|store| store.get(bucket)))
    }

    fn add(&self, counter: &str, bucket: Timestamp, delta: Value) -> crate::Result<()> {
        self.store(counter).add(bucket, delta);
        Ok(())
    }

    fn set(&self, counter: &str, bucket: Timestamp, value: Value) -> crate::Result<()> {
        self.store(counter).set(bucket, value);
        Ok(())
    }

    fn get_range(
        &self,
        counter: &str,
        buckets: &[Timestamp],
    ) -> crate::Result<crate::HashMap<Timestamp, Value>> {
        let mut map =
            crate::HashMap::with_capacity_and_hasher(buckets.len(), rustc_hash::FxBuildHasher);

        // resolve the per-counter store once instead of per bucket
        let Some(store) = self.existing_store(counter) else {
            return Ok(map);
        };

        for &bucket in buckets {
            if let Some(value) = store.get(bucket) {
                map.insert(bucket, value);
            }
        }

        Ok(map)
    }
}
