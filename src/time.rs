use crate::Timestamp;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current UNIX timestamp in milliseconds.
#[must_use]
#[allow(clippy::expect_used)]
pub fn timestamp() -> Timestamp {
    let start = SystemTime::now();
    let since_the_epoch = start
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards");

    Timestamp::try_from(since_the_epoch.as_millis()).expect("timestamp should fit i64")
}
