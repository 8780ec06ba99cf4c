use crate::{Error, Timestamp};

/// Snaps a timestamp to the start of the bucket that contains it.
///
/// The returned value is the largest multiple of `width` that is less than or
/// equal to `timestamp`, so `bucket_start(t, w) <= t < bucket_start(t, w) + w`
/// holds for every timestamp, negative ones included.
///
/// # Errors
///
/// Returns [`Error::InvalidBucketWidth`] if `width` is not positive.
pub fn bucket_start(timestamp: Timestamp, width: i64) -> crate::Result<Timestamp> {
    if width <= 0 {
        return Err(Error::InvalidBucketWidth(width));
    }
    Ok(timestamp - timestamp.rem_euclid(width))
}

/// Width in milliseconds of a bucket spanning `steps` base buckets.
///
/// `steps < 1` is normalized to 1, not rejected; callers may request
/// degenerate widths.
#[must_use]
pub fn step_width(base_resolution: i64, steps: u32) -> i64 {
    base_resolution * i64::from(steps.max(1))
}
