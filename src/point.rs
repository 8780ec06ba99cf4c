use crate::{Timestamp, Value};

/// How the values inside a bucket are aggregated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Aggregation {
    /// Sum of all values.
    #[default]
    Sum,

    /// Minimum of all values.
    Minimum,

    /// Maximum of all values.
    Maximum,

    /// Truncating mean of all values.
    Average,

    /// Marker for a bucket with no recorded data.
    ///
    /// Distinct from a recorded zero.
    None,
}

impl Aggregation {
    // Identity element the accumulator is reset to when the kind changes.
    fn identity(self) -> Value {
        match self {
            Self::Minimum => Value::MAX,
            Self::Maximum => Value::MIN,
            Self::Sum | Self::Average | Self::None => 0,
        }
    }
}

/// A single aggregated time series data point.
///
/// Covers the window `[timestamp, timestamp + block_size)` and carries the
/// aggregate of every base bucket folded into it so far. Points are immutable
/// from the outside; merging happens only inside the resampling code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DataPoint {
    kind: Aggregation,
    timestamp: Timestamp,
    block_size: i64,
    value: Value,
    samples: i64,
}

impl DataPoint {
    /// Creates a data point holding one recorded value.
    ///
    /// A point created with kind [`Aggregation::None`] carries no value and no
    /// samples, whatever `value` was passed.
    #[must_use]
    pub fn new(kind: Aggregation, timestamp: Timestamp, value: Value, block_size: i64) -> Self {
        let mut point = Self::absent(timestamp, block_size);
        point.set_kind(kind);

        if kind != Aggregation::None {
            point.set_value(value);
        }

        point
    }

    /// Creates a data point marking a bucket with no recorded data.
    #[must_use]
    pub fn absent(timestamp: Timestamp, block_size: i64) -> Self {
        Self {
            kind: Aggregation::None,
            timestamp,
            block_size,
            value: 0,
            samples: 0,
        }
    }

    /// The aggregation kind of this point.
    #[must_use]
    pub fn kind(&self) -> Aggregation {
        self.kind
    }

    /// Bucket start (UNIX milliseconds, a multiple of the block size).
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Width in milliseconds this point aggregates over.
    #[must_use]
    pub fn block_size(&self) -> i64 {
        self.block_size
    }

    /// Number of base values folded into this point.
    #[must_use]
    pub fn samples(&self) -> i64 {
        self.samples
    }

    /// Changes the aggregation kind.
    ///
    /// If the kind actually changes, the accumulated value is reset to the new
    /// kind's identity element and the sample count to zero.
    pub(crate) fn set_kind(&mut self, kind: Aggregation) {
        if self.kind != kind {
            self.kind = kind;
            self.value = kind.identity();
            self.samples = 0;
        }
    }

    /// Folds one raw scalar into the accumulator, per its kind.
    ///
    /// # Panics
    ///
    /// Panics if the point's kind is [`Aggregation::None`]; a bucket without
    /// data is not a valid aggregation target.
    pub(crate) fn add_value(&mut self, value: Value) {
        match self.kind {
            Aggregation::Minimum => self.value = self.value.min(value),
            Aggregation::Maximum => self.value = self.value.max(value),
            Aggregation::Sum | Aggregation::Average => {
                self.value += value;
                self.samples += 1;
            }
            Aggregation::None => panic!("cannot aggregate into a point without data"),
        }
    }

    /// Folds another point into the accumulator.
    ///
    /// An accumulator that is still [`Aggregation::None`] becomes a copy of
    /// `other`, kind included. Otherwise `other`'s visible value is folded in,
    /// unless `other` itself carries no data.
    pub(crate) fn add_point(&mut self, other: &Self) {
        if self.kind == Aggregation::None {
            self.kind = other.kind;
            self.value = other.value;
            self.samples = other.samples;
        } else if other.kind != Aggregation::None {
            self.add_value(other.value());
        }
    }

    /// Overwrites the accumulated value.
    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = value;
        self.samples = 1;
    }

    /// The externally visible aggregate.
    ///
    /// For [`Aggregation::Average`] this is the truncating mean of all folded
    /// samples; for [`Aggregation::None`] it is 0.
    #[must_use]
    pub fn value(&self) -> Value {
        match self.kind {
            Aggregation::Average => {
                if self.samples == 0 {
                    0
                } else {
                    self.value / self.samples
                }
            }
            Aggregation::None => 0,
            Aggregation::Sum | Aggregation::Minimum | Aggregation::Maximum => self.value,
        }
    }
}
