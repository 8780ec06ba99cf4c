use crate::{Timestamp, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

/// Default capacity, roughly one day of one-second buckets.
pub const DEFAULT_MAX_BUCKETS: usize = 86_400;

const MIN_BUFFER_BUCKETS: usize = 20;

/// A bounded, concurrency-safe mapping from base bucket timestamp to an
/// accumulated scalar.
///
/// Holds at most `max_buckets` entries. When a write pushes the size over that
/// limit, the oldest buckets are trimmed down to `max_buckets - buffer_buckets`
/// so the sort-and-trim is amortized over many subsequent writes instead of
/// re-triggering on every insert.
///
/// `add` and `set` on an existing bucket are per-key atomic and run under a
/// shared lock; only slot creation and the eviction scan take the lock
/// exclusively.
pub struct BoundedStore {
    slots: RwLock<crate::HashMap<Timestamp, AtomicI64>>,
    max_buckets: usize,
    buffer_buckets: usize,
}

impl Default for BoundedStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUCKETS)
    }
}

impl BoundedStore {
    /// Creates a store holding at most `max_buckets` buckets.
    ///
    /// The eviction buffer defaults to a tenth of the capacity, with a small
    /// minimum.
    #[must_use]
    pub fn new(max_buckets: usize) -> Self {
        let buffer_buckets = (max_buckets / 10).max(MIN_BUFFER_BUCKETS).min(max_buckets);
        Self::with_buffer(max_buckets, buffer_buckets)
    }

    /// Creates a store with an explicit eviction buffer.
    ///
    /// # Panics
    ///
    /// Panics if `buffer_buckets` exceeds `max_buckets`.
    #[must_use]
    pub fn with_buffer(max_buckets: usize, buffer_buckets: usize) -> Self {
        assert!(
            buffer_buckets <= max_buckets,
            "buffer_buckets must not exceed max_buckets",
        );

        Self {
            slots: RwLock::default(),
            max_buckets,
            buffer_buckets,
        }
    }

    /// Atomically adds `delta` to a bucket, creating it if missing.
    pub fn add(&self, bucket: Timestamp, delta: Value) {
        {
            let slots = self.slots.read().expect("lock is poisoned");

            if let Some(slot) = slots.get(&bucket) {
                slot.fetch_add(delta, Ordering::Relaxed);
                return;
            }
        }

        let mut slots = self.slots.write().expect("lock is poisoned");
        slots
            .entry(bucket)
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(delta, Ordering::Relaxed);

        if slots.len() > self.max_buckets {
            self.reduce(&mut slots);
        }
    }

    /// Overwrites a bucket, creating it if missing.
    pub fn set(&self, bucket: Timestamp, value: Value) {
        {
            let slots = self.slots.read().expect("lock is poisoned");

            if let Some(slot) = slots.get(&bucket) {
                slot.store(value, Ordering::Relaxed);
                return;
            }
        }

        let mut slots = self.slots.write().expect("lock is poisoned");
        slots
            .entry(bucket)
            .or_insert_with(|| AtomicI64::new(0))
            .store(value, Ordering::Relaxed);

        if slots.len() > self.max_buckets {
            self.reduce(&mut slots);
        }
    }

    /// Reads the current scalar of a bucket, if any.
    #[must_use]
    pub fn get(&self, bucket: Timestamp) -> Option<Value> {
        self.slots
            .read()
            .expect("lock is poisoned")
            .get(&bucket)
            .map(|slot| slot.load(Ordering::Relaxed))
    }

    /// Number of buckets currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().expect("lock is poisoned").len()
    }

    /// Returns `true` if no bucket is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Trims the oldest buckets down to `max_buckets - buffer_buckets`.
    // Caller holds the write lock.
    fn reduce(&self, slots: &mut crate::HashMap<Timestamp, AtomicI64>) {
        let mut keys = slots.keys().copied().collect::<Vec<_>>();
        keys.sort_unstable();

        let excess = keys
            .len()
            .saturating_sub(self.max_buckets - self.buffer_buckets);

        log::trace!("evicting {excess} oldest of {} buckets", keys.len());

        for key in keys.into_iter().take(excess) {
            slots.remove(&key);
        }
    }
}
