use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bucket of a time series. A `count` of zero marks a placeholder for
/// a bucket that saw no samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint<T> {
    pub time: DateTime<Utc>,
    pub value: T,
    pub count: u64,
}

impl<T> TimePoint<T> {
    #[must_use]
    pub const fn new(time: DateTime<Utc>, value: T) -> Self {
        Self {
            time,
            value,
            count: 1,
        }
    }

    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.count == 0
    }
}

impl<T: Default> TimePoint<T> {
    #[must_use]
    pub fn placeholder(time: DateTime<Utc>) -> Self {
        Self {
            time,
            value: T::default(),
            count: 0,
        }
    }
}

/// Raw, unrounded contents of a series as handed to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesData<T> {
    pub interval: Duration,
    pub max_count: usize,
    pub points: Vec<TimePoint<T>>,
}

/// Query copy of a series with the final point's time rounded.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot<T> {
    pub points: Vec<TimePoint<T>>,
    pub interval: Duration,
    pub max_count: usize,
}

impl<T: Clone> SeriesSnapshot<T> {
    #[must_use]
    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.points.iter().map(|point| point.time).collect()
    }

    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.points.iter().map(|point| point.value.clone()).collect()
    }
}
