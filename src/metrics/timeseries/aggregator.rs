//! Combining functions for points that land in the same bucket.
//!
//! Every aggregator receives the stored point first and the incoming point
//! second. Where the rule leaves a tie, the incoming point wins.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::point::TimePoint;
use super::value::Numeric;

pub type Aggregator<T> = fn(&TimePoint<T>, &TimePoint<T>) -> TimePoint<T>;

/// Adds values and counts; keeps the later time.
#[must_use]
pub fn sum<T: Numeric>(older: &TimePoint<T>, newer: &TimePoint<T>) -> TimePoint<T> {
    TimePoint {
        time: older.time.max(newer.time),
        value: older.value.plus(newer.value),
        count: older.count.saturating_add(newer.count),
    }
}

/// Count-weighted mean; keeps the later time.
#[must_use]
pub fn avg<T: Numeric>(older: &TimePoint<T>, newer: &TimePoint<T>) -> TimePoint<T> {
    let time = older.time.max(newer.time);
    let count = older.count.saturating_add(newer.count);
    if count == 0 {
        return TimePoint::placeholder(time);
    }
    let weighted = older.value.to_f64() * count_as_f64(older.count)
        + newer.value.to_f64() * count_as_f64(newer.count);
    TimePoint {
        time,
        value: T::from_f64(weighted / count_as_f64(count)),
        count,
    }
}

#[must_use]
pub fn last<T: Clone>(older: &TimePoint<T>, newer: &TimePoint<T>) -> TimePoint<T> {
    if older.time > newer.time {
        older.clone()
    } else {
        newer.clone()
    }
}

#[must_use]
pub fn first<T: Clone>(older: &TimePoint<T>, newer: &TimePoint<T>) -> TimePoint<T> {
    if older.time < newer.time {
        older.clone()
    } else {
        newer.clone()
    }
}

#[must_use]
pub fn min<T: Numeric>(older: &TimePoint<T>, newer: &TimePoint<T>) -> TimePoint<T> {
    if older.value < newer.value {
        older.clone()
    } else {
        newer.clone()
    }
}

#[must_use]
pub fn max<T: Numeric>(older: &TimePoint<T>, newer: &TimePoint<T>) -> TimePoint<T> {
    if older.value > newer.value {
        older.clone()
    } else {
        newer.clone()
    }
}

const fn count_as_f64(count: u64) -> f64 {
    count as f64
}

/// Named aggregation, as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Avg,
    Last,
    First,
    Min,
    Max,
}

impl Aggregation {
    #[must_use]
    pub fn aggregator<T: Numeric>(self) -> Aggregator<T> {
        match self {
            Aggregation::Sum => sum::<T>,
            Aggregation::Avg => avg::<T>,
            Aggregation::Last => last::<T>,
            Aggregation::First => first::<T>,
            Aggregation::Min => min::<T>,
            Aggregation::Max => max::<T>,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Last => "last",
            Aggregation::First => "first",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
