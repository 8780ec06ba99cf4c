/// Helpers for calculating durations
///
/// All helpers return millisecond time frames, the unit the engine works in.
///
/// ```
/// use teljari::{Aggregation, CounterFactory, CounterName, Duration, MemoryStorage};
///
/// let factory = CounterFactory::new(MemoryStorage::default());
/// let counter = factory.counter(CounterName::try_from("cpu.stolen").unwrap());
///
/// counter.add(1)?;
///
/// let now = teljari::timestamp();
///
/// // sum per minute over the last 15 minutes
/// let series = counter.series(
///     now - Duration::minutes(15),
///     now + 1,
///     60,
///     Aggregation::Sum,
/// )?;
///
/// println!("{series:#?}");
///
/// # Ok::<(), teljari::Error>(())
/// ```
pub struct Duration;

impl Duration {
    /// Formats N weeks as millisecond time frame.
    #[must_use]
    pub const fn weeks(n: i64) -> i64 {
        Self::days(n) * 7
    }

    /// Formats N days as millisecond time frame.
    #[must_use]
    pub const fn days(n: i64) -> i64 {
        Self::hours(n) * 24
    }

    /// Formats N hours as millisecond time frame.
    #[must_use]
    pub const fn hours(n: i64) -> i64 {
        Self::minutes(n) * 60
    }

    /// Formats N minutes as millisecond time frame.
    #[must_use]
    pub const fn minutes(n: i64) -> i64 {
        Self::seconds(n) * 60
    }

    /// Formats N seconds as millisecond time frame.
    #[must_use]
    pub const fn seconds(n: i64) -> i64 {
        Self::millis(n) * 1_000
    }

    /// Formats N milliseconds as millisecond time frame.
    #[must_use]
    pub const fn millis(n: i64) -> i64 {
        n
    }
}
