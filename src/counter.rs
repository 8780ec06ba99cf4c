use crate::bucket::{bucket_start, step_width};
use crate::counter_name::CounterName;
use crate::point::{Aggregation, DataPoint};
use crate::storage::Storage;
use crate::{Timestamp, Value};
use std::sync::Arc;

/// Default storage base resolution: one second.
pub const DEFAULT_BASE_RESOLUTION_MS: i64 = 1_000;

/// A named time series counter over a storage backend.
///
/// Writes snap the given instant to a base-resolution bucket and forward the
/// scalar to the backend. Reads fetch dense runs of base buckets and resample
/// them into coarser points of `steps` base buckets each, aggregated per the
/// requested [`Aggregation`].
pub struct Counter<S: Storage> {
    name: String,
    storage: Arc<S>,
    base_resolution: i64,
}

impl<S: Storage> Counter<S> {
    /// Creates a counter over the given backend, at the default base
    /// resolution of one second.
    #[must_use]
    pub fn new(name: CounterName<'_>, storage: Arc<S>) -> Self {
        Self {
            name: name.to_string(),
            storage,
            base_resolution: DEFAULT_BASE_RESOLUTION_MS,
        }
    }

    /// Changes the base resolution (bucket width the backend stores at).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidBucketWidth`] if `resolution` is not
    /// positive.
    pub fn with_base_resolution(mut self, resolution: i64) -> crate::Result<Self> {
        if resolution <= 0 {
            return Err(crate::Error::InvalidBucketWidth(resolution));
        }
        self.base_resolution = resolution;
        Ok(self)
    }

    /// The counter's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The base resolution in milliseconds.
    #[must_use]
    pub fn base_resolution(&self) -> i64 {
        self.base_resolution
    }

    /// Adds `delta` to the current bucket.
    ///
    /// # Errors
    ///
    /// Returns error if the backend failed or does not support increments.
    pub fn add(&self, delta: Value) -> crate::Result<()> {
        self.add_at(crate::time::timestamp(), delta)
    }

    /// Adds `delta` to the bucket containing `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend failed or does not support increments.
    pub fn add_at(&self, timestamp: Timestamp, delta: Value) -> crate::Result<()> {
        let bucket = bucket_start(timestamp, self.base_resolution)?;
        log::trace!("{} += {delta} @ {bucket}", self.name);
        self.storage.add(&self.name, bucket, delta)
    }

    /// Overwrites the current bucket.
    ///
    /// # Errors
    ///
    /// Returns error if the backend failed or does not support overwrites.
    pub fn set(&self, value: Value) -> crate::Result<()> {
        self.set_at(crate::time::timestamp(), value)
    }

    /// Overwrites the bucket containing `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend failed or does not support overwrites.
    pub fn set_at(&self, timestamp: Timestamp, value: Value) -> crate::Result<()> {
        let bucket = bucket_start(timestamp, self.base_resolution)?;
        log::trace!("{} := {value} @ {bucket}", self.name);
        self.storage.set(&self.name, bucket, value)
    }

    /// Reads the single base bucket containing `timestamp`.
    ///
    /// A bucket the backend holds data for comes back as [`Aggregation::Sum`];
    /// an empty bucket comes back as [`Aggregation::None`] with value 0.
    ///
    /// # Errors
    ///
    /// Returns error if the backend failed.
    pub fn get(&self, timestamp: Timestamp) -> crate::Result<DataPoint> {
        let bucket = bucket_start(timestamp, self.base_resolution)?;

        Ok(self.storage.get(&self.name, bucket)?.map_or_else(
            || DataPoint::absent(bucket, self.base_resolution),
            |value| DataPoint::new(Aggregation::Sum, bucket, value, self.base_resolution),
        ))
    }

    /// Aggregates the `steps` base buckets starting at the coarse bucket
    /// containing `timestamp` into one point of the requested kind.
    ///
    /// If every constituent bucket is absent, the returned point keeps kind
    /// [`Aggregation::None`] (value 0) instead of adopting `kind`, so "no data
    /// at all" stays distinguishable from aggregated zeros. `steps < 1` is
    /// normalized to 1.
    ///
    /// # Errors
    ///
    /// Returns error if the backend failed.
    pub fn get_aggregate(
        &self,
        timestamp: Timestamp,
        kind: Aggregation,
        steps: u32,
    ) -> crate::Result<DataPoint> {
        let steps = steps.max(1);
        let block_size = step_width(self.base_resolution, steps);
        let start = bucket_start(timestamp, block_size)?;

        let buckets = (0..i64::from(steps))
            .map(|i| start + i * self.base_resolution)
            .collect::<Vec<_>>();

        let values = self.storage.get_range(&self.name, &buckets)?;

        let mut result = DataPoint::absent(start, block_size);

        for bucket in buckets {
            let point = values.get(&bucket).map_or_else(
                || DataPoint::absent(bucket, self.base_resolution),
                |&value| DataPoint::new(Aggregation::Sum, bucket, value, self.base_resolution),
            );

            if result.kind() == Aggregation::None && point.kind() != Aggregation::None {
                result.set_kind(kind);
            }
            result.add_point(&point);
        }

        Ok(result)
    }

    // Fetches one point per base bucket covering [start, end), sorted
    // ascending. The end key is inclusive on the bucket boundary; if it
    // collapses onto `start`, it is recomputed from `end - 1` so a degenerate
    // start == end range stays empty.
    fn base_points(&self, start: Timestamp, end: Timestamp) -> crate::Result<Vec<DataPoint>> {
        let key_start = bucket_start(start, self.base_resolution)?;
        let mut key_end = bucket_start(end, self.base_resolution)?;
        if key_end == start {
            key_end = bucket_start(end - 1, self.base_resolution)?;
        }

        let mut buckets = Vec::new();
        let mut bucket = key_start;
        while bucket <= key_end {
            buckets.push(bucket);
            bucket += self.base_resolution;
        }

        log::debug!(
            "querying {} base buckets of {} [{key_start}..={key_end}]",
            buckets.len(),
            self.name,
        );

        let values = self.storage.get_range(&self.name, &buckets)?;

        let mut points = buckets
            .into_iter()
            .map(|bucket| {
                values.get(&bucket).map_or_else(
                    || DataPoint::absent(bucket, self.base_resolution),
                    |&value| DataPoint::new(Aggregation::Sum, bucket, value, self.base_resolution),
                )
            })
            .collect::<Vec<_>>();

        // batch reads carry no ordering guarantee
        points.sort_unstable_by_key(DataPoint::timestamp);

        Ok(points)
    }

    /// Resamples `[start, end)` into points of `steps` base buckets each.
    ///
    /// Points come back ordered ascending by timestamp. The last group may
    /// aggregate fewer than `steps` base buckets; it is not padded. A group
    /// whose base buckets are all absent stays [`Aggregation::None`];
    /// otherwise it adopts the requested `kind` with its first real datum.
    /// `steps < 1` is normalized to 1.
    ///
    /// # Errors
    ///
    /// Returns error if the backend failed.
    pub fn series(
        &self,
        start: Timestamp,
        end: Timestamp,
        steps: u32,
        kind: Aggregation,
    ) -> crate::Result<Vec<DataPoint>> {
        let steps = steps.max(1);
        let origin = self.base_points(start, end)?;

        if steps == 1 {
            return Ok(origin);
        }

        let block_size = step_width(self.base_resolution, steps);
        let mut result = Vec::with_capacity(origin.len().div_ceil(steps as usize));

        for group in origin.chunks(steps as usize) {
            let Some(first) = group.first() else {
                continue;
            };

            // fresh accumulator per output bucket
            let mut point = DataPoint::absent(bucket_start(first.timestamp(), block_size)?, block_size);

            for origin_point in group {
                if point.kind() == Aggregation::None && origin_point.kind() != Aggregation::None {
                    point.set_kind(kind);
                }
                point.add_point(origin_point);
            }

            result.push(point);
        }

        Ok(result)
    }

    /// Returns the last `n` points of `steps` base buckets each, newest last.
    ///
    /// The newest point covers the current, still partial bucket, so it may
    /// aggregate less than its block size of elapsed time. Absent buckets
    /// surface as [`Aggregation::None`] points; exactly `n` points are
    /// returned regardless of how much data exists. `n < 1` and `steps < 1`
    /// are normalized to 1.
    ///
    /// # Errors
    ///
    /// Returns error if the backend failed.
    pub fn last_n(&self, n: u32, steps: u32, kind: Aggregation) -> crate::Result<Vec<DataPoint>> {
        let n = i64::from(n.max(1));
        let steps = steps.max(1);

        let block_size = step_width(self.base_resolution, steps);
        let now = crate::time::timestamp();
        let start = bucket_start(now, block_size)? - (n - 1) * block_size;

        self.series(start, now + 1, steps, kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use test_log::test;

    fn counter(name: &'static str) -> Counter<MemoryStorage> {
        Counter::new(
            CounterName::try_from(name).unwrap(),
            Arc::new(MemoryStorage::default()),
        )
    }

    #[test]
    fn add_then_get_round_trip() -> crate::Result<()> {
        let counter = counter("a");

        counter.add_at(1_500, 4)?;
        assert_eq!(4, counter.get(1_500)?.value());
        assert_eq!(4, counter.get(1_999)?.value());

        counter.add_at(1_999, 3)?;
        assert_eq!(7, counter.get(1_000)?.value());

        Ok(())
    }

    #[test]
    fn set_overwrites_bucket() -> crate::Result<()> {
        let counter = counter("a");

        counter.add_at(1_000, 4)?;
        counter.set_at(1_000, 10)?;

        assert_eq!(10, counter.get(1_000)?.value());

        Ok(())
    }

    #[test]
    fn get_on_empty_bucket_is_absent() -> crate::Result<()> {
        let counter = counter("a");

        let point = counter.get(5_123)?;
        assert_eq!(Aggregation::None, point.kind());
        assert_eq!(0, point.value());
        assert_eq!(5_000, point.timestamp());

        Ok(())
    }

    #[test]
    fn series_with_single_steps_returns_base_buckets() -> crate::Result<()> {
        let counter = counter("a");

        for (ts, value) in [(0, 1), (2_500, 2), (9_999, 3)] {
            counter.add_at(ts, value)?;
        }

        let series = counter.series(0, 10_000, 1, Aggregation::Sum)?;

        // [0, 10_000) covers buckets 0..=10_000 inclusive of the end boundary
        assert_eq!(11, series.len());

        assert_eq!(1, series.first().unwrap().value());
        assert_eq!(Aggregation::None, series.get(1).unwrap().kind());
        assert_eq!(2, series.get(2).unwrap().value());
        assert_eq!(3, series.get(9).unwrap().value());

        for (idx, point) in series.iter().enumerate() {
            assert_eq!(idx as Timestamp * 1_000, point.timestamp());
            assert_eq!(1_000, point.block_size());
        }

        Ok(())
    }

    #[test]
    fn series_resamples_into_coarser_buckets() -> crate::Result<()> {
        let counter = counter("a");

        counter.add_at(0, 2)?;
        counter.add_at(1_000, 1)?;
        counter.add_at(2_000, 5)?;
        counter.add_at(3_000, 4)?;

        let series = counter.series(0, 4_000, 3, Aggregation::Sum)?;

        // 5 base buckets in groups of 3: [0,1k,2k], [3k,4k]
        assert_eq!(2, series.len());

        let first = series.first().unwrap();
        assert_eq!(0, first.timestamp());
        assert_eq!(3_000, first.block_size());
        assert_eq!(8, first.value());

        // last group is short, not padded
        let last = series.last().unwrap();
        assert_eq!(3_000, last.timestamp());
        assert_eq!(4, last.value());

        Ok(())
    }

    #[test]
    fn series_adopts_requested_kind_lazily() -> crate::Result<()> {
        let counter = counter("a");

        counter.add_at(3_000, 9)?;

        let series = counter.series(0, 6_000, 3, Aggregation::Maximum)?;
        assert_eq!(3, series.len());

        // no data at all: stays None
        assert_eq!(Aggregation::None, series.first().unwrap().kind());
        assert_eq!(0, series.first().unwrap().value());

        // first real datum flips the group to the requested kind
        assert_eq!(Aggregation::Maximum, series.get(1).unwrap().kind());
        assert_eq!(9, series.get(1).unwrap().value());

        Ok(())
    }

    #[test]
    fn degenerate_range_is_empty() -> crate::Result<()> {
        let counter = counter("a");
        counter.add_at(1_000, 1)?;

        assert!(counter.series(1_000, 1_000, 1, Aggregation::Sum)?.is_empty());

        Ok(())
    }

    #[test]
    fn aggregate_over_seven_steps() -> crate::Result<()> {
        let counter = counter("a");
        let x = 7_000 * 100;

        counter.add_at(x + 1, 2)?;
        counter.add_at(x + 2_001, -1)?;
        counter.add_at(x + 3_001, 2)?;

        assert_eq!(3, counter.get_aggregate(x, Aggregation::Sum, 7)?.value());
        assert_eq!(-1, counter.get_aggregate(x, Aggregation::Minimum, 7)?.value());
        assert_eq!(2, counter.get_aggregate(x, Aggregation::Maximum, 7)?.value());
        assert_eq!(1, counter.get_aggregate(x, Aggregation::Average, 7)?.value());

        let point = counter.get_aggregate(x, Aggregation::Sum, 7)?;
        assert_eq!(x, point.timestamp());
        assert_eq!(7_000, point.block_size());

        Ok(())
    }

    #[test]
    fn aggregate_without_data_stays_absent() -> crate::Result<()> {
        let counter = counter("a");

        let point = counter.get_aggregate(0, Aggregation::Sum, 7)?;
        assert_eq!(Aggregation::None, point.kind());
        assert_eq!(0, point.value());

        Ok(())
    }

    #[test]
    fn aggregate_clamps_steps() -> crate::Result<()> {
        let counter = counter("a");
        counter.add_at(500, 3)?;

        let point = counter.get_aggregate(500, Aggregation::Sum, 0)?;
        assert_eq!(3, point.value());
        assert_eq!(1_000, point.block_size());

        Ok(())
    }

    #[test]
    fn last_n_returns_exactly_n_points() -> crate::Result<()> {
        let counter = counter("a");

        counter.add(5)?;
        counter.add(3)?;

        for (n, steps) in [(1, 1), (5, 1), (3, 4), (10, 60)] {
            let series = counter.last_n(n, steps, Aggregation::Sum)?;
            assert_eq!(n as usize, series.len(), "n={n} steps={steps}");

            let newest = series.last().unwrap();
            assert_eq!(8, newest.value());
            assert_eq!(step_width(1_000, steps), newest.block_size());
        }

        Ok(())
    }

    #[test]
    fn last_n_clamps_arguments() -> crate::Result<()> {
        let counter = counter("a");

        assert_eq!(1, counter.last_n(0, 0, Aggregation::Sum)?.len());

        Ok(())
    }

    #[test]
    fn last_n_surfaces_absent_history() -> crate::Result<()> {
        let counter = counter("a");
        counter.add(1)?;

        let series = counter.last_n(4, 1, Aggregation::Sum)?;
        assert_eq!(4, series.len());

        for point in series.iter().take(3) {
            assert_eq!(Aggregation::None, point.kind());
        }

        Ok(())
    }

    #[test]
    fn custom_base_resolution() -> crate::Result<()> {
        let counter = counter("a").with_base_resolution(100)?;

        counter.add_at(123, 4)?;
        counter.add_at(199, 2)?;

        assert_eq!(6, counter.get(150)?.value());
        assert_eq!(100, counter.get(150)?.timestamp());

        Ok(())
    }

    #[test]
    fn non_positive_base_resolution_is_rejected() {
        assert!(counter("a").with_base_resolution(0).is_err());
        assert!(counter("a").with_base_resolution(-1_000).is_err());
    }

    #[test]
    fn concurrent_adds_visible_through_get() -> crate::Result<()> {
        let counter = Arc::new(counter("a"));
        let ts = 42_000;

        let threads = (0..4)
            .map(|_| {
                let counter = counter.clone();

                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        counter.add_at(ts, 5).unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();

        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(20_000, counter.get(ts)?.value());

        Ok(())
    }

    #[test]
    fn works_against_disk_storage() -> crate::Result<()> {
        let path = tempfile::tempdir()?;
        let storage = Arc::new(crate::DiskStorage::open(&path)?);

        let counter = Counter::new(CounterName::try_from("a").unwrap(), storage);

        counter.add_at(1_500, 4)?;
        counter.add_at(2_500, 1)?;
        counter.add_at(3_500, 7)?;

        assert_eq!(4, counter.get(1_000)?.value());

        let point = counter.get_aggregate(0, Aggregation::Maximum, 7)?;
        assert_eq!(7, point.value());

        let series = counter.series(1_000, 4_000, 1, Aggregation::Sum)?;
        assert_eq!(4, series.len());

        Ok(())
    }
}