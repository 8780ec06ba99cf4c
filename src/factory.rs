use crate::counter::{Counter, DEFAULT_BASE_RESOLUTION_MS};
use crate::counter_name::CounterName;
use crate::storage::Storage;
use std::sync::{Arc, RwLock};

/// Hands out counters sharing one storage backend.
///
/// Counters are cached by name, so repeated lookups return the same handle.
///
/// ```
/// use teljari::{CounterFactory, CounterName, MemoryStorage};
///
/// let factory = CounterFactory::new(MemoryStorage::default());
///
/// let name = CounterName::try_from("page.views").unwrap();
/// let counter = factory.counter(name);
///
/// counter.add(1)?;
///
/// # Ok::<(), teljari::Error>(())
/// ```
pub struct CounterFactory<S: Storage> {
    storage: Arc<S>,
    base_resolution: i64,
    counters: RwLock<crate::HashMap<String, Arc<Counter<S>>>>,
}

impl<S: Storage> CounterFactory<S> {
    /// Creates a factory over the given backend, at the default base
    /// resolution of one second.
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self {
            storage: Arc::new(storage),
            base_resolution: DEFAULT_BASE_RESOLUTION_MS,
            counters: RwLock::default(),
        }
    }

    /// Changes the base resolution handed to new counters.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidBucketWidth`] if `resolution` is not
    /// positive.
    pub fn base_resolution(mut self, resolution: i64) -> crate::Result<Self> {
        if resolution <= 0 {
            return Err(crate::Error::InvalidBucketWidth(resolution));
        }
        self.base_resolution = resolution;
        Ok(self)
    }

    /// Gets or creates the counter with the given name.
    #[allow(clippy::missing_panics_doc, clippy::expect_used)]
    pub fn counter(&self, name: CounterName<'_>) -> Arc<Counter<S>> {
        if let Some(counter) = self.counters.read().expect("lock is poisoned").get(*name) {
            return counter.clone();
        }

        let mut lock = self.counters.write().expect("lock is poisoned");

        lock.entry(name.to_string())
            .or_insert_with(|| {
                log::trace!("creating counter {name}");

                // base resolution was validated when the factory was configured
                let counter = Counter::new(name, self.storage.clone())
                    .with_base_resolution(self.base_resolution)
                    .expect("base resolution should be positive");

                Arc::new(counter)
            })
            .clone()
    }
}
