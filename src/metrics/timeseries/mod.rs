//! Rolling, interval-aligned aggregation windows.
//!
//! A [`TimeSeries`] keeps at most `max_count` points, one per interval.
//! Bucket distance is computed on truncated timestamps; the reported time of
//! a bucket is its end boundary. The newest point keeps its raw time until a
//! later bucket supersedes it, so queries round it on the way out.
mod aggregator;
mod multi;
mod point;
mod value;


use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::clock::{SharedClock, system_clock};
use super::extension::Extension;

pub use aggregator::{Aggregation, Aggregator, avg, first, last, max, min, sum};
pub use multi::MultiTimeSeries;
pub use point::{SeriesData, SeriesSnapshot, TimePoint};
pub use value::{Numeric, SeriesValue};

/// Invoked with every bucket a series closes, including placeholders.
pub type CloseListener<T> = Arc<dyn Fn(&TimePoint<T>) + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesMeta {
    pub title: String,
    pub unit: String,
}

pub struct TimeSeries<T> {
    interval: Duration,
    step: TimeDelta,
    half_step: TimeDelta,
    max_count: usize,
    aggregator: Option<Aggregator<T>>,
    raw_time: bool,
    meta: Option<SeriesMeta>,
    clock: SharedClock,
    listener: Option<CloseListener<T>>,
    data: Mutex<VecDeque<TimePoint<T>>>,
}

impl<T: SeriesValue> TimeSeries<T> {
    /// Without an aggregator a sample replaces the point of its bucket;
    /// with one, the stored point and the sample are combined.
    ///
    /// A `max_count` of zero is treated as one.
    #[must_use]
    pub fn new(interval: Duration, max_count: usize, aggregator: Option<Aggregator<T>>) -> Self {
        let step = TimeDelta::from_std(interval).unwrap_or_else(|_| TimeDelta::zero());
        let half_step = step
            .num_nanoseconds()
            .and_then(|nanos| nanos.checked_div(2))
            .map_or_else(TimeDelta::zero, TimeDelta::nanoseconds);
        let max_count = max_count.max(1);
        Self {
            interval,
            step,
            half_step,
            max_count,
            aggregator,
            raw_time: false,
            meta: None,
            clock: system_clock(),
            listener: None,
            data: Mutex::new(VecDeque::with_capacity(max_count)),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Report stored times as-is instead of rounding to bucket boundaries.
    #[must_use]
    pub fn with_raw_time(mut self, raw_time: bool) -> Self {
        self.raw_time = raw_time;
        self
    }

    #[must_use]
    pub fn with_listener(mut self, listener: CloseListener<T>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn set_meta(&mut self, meta: Option<SeriesMeta>) {
        self.meta = meta;
    }

    #[must_use]
    pub const fn meta(&self) -> Option<&SeriesMeta> {
        self.meta.as_ref()
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn max_count(&self) -> usize {
        self.max_count
    }

    #[must_use]
    pub const fn uses_raw_time(&self) -> bool {
        self.raw_time
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Record `value` at the series clock's current time.
    pub fn add(&self, value: T) {
        let now = self.clock.now();
        self.add_point(TimePoint::new(now, value));
    }

    /// Record `value` at `time`. Times must not go backwards; an earlier
    /// time folds into the newest bucket.
    pub fn add_time(&self, time: DateTime<Utc>, value: T) {
        self.add_point(TimePoint::new(time, value));
    }

    fn add_point(&self, datum: TimePoint<T>) {
        let closed = {
            let mut data = self.lock();
            self.insert(&mut data, datum)
        };
        if let Some(listener) = self.listener.as_ref() {
            for point in &closed {
                listener(point);
            }
        }
    }

    fn insert(&self, data: &mut VecDeque<TimePoint<T>>, datum: TimePoint<T>) -> Vec<TimePoint<T>> {
        let Some(last) = data.back_mut() else {
            data.push_back(datum);
            return Vec::new();
        };

        let roll = self.interval_between(last.time, datum.time);
        if roll <= 0 {
            *last = match self.aggregator {
                Some(aggregate) => aggregate(last, &datum),
                None => datum,
            };
            return Vec::new();
        }

        last.time = self.round_time(last.time);
        let finalized = last.clone();

        let max_roll = i64::try_from(self.max_count).unwrap_or(i64::MAX);
        if roll >= max_roll {
            data.clear();
            data.push_back(datum);
            return vec![finalized];
        }

        let mut time = finalized.time;
        let mut closed = Vec::with_capacity(usize::try_from(roll).unwrap_or(0));
        closed.push(finalized);
        for _ in 1..roll {
            time = time.checked_add_signed(self.step).unwrap_or(time);
            let placeholder = TimePoint::placeholder(time);
            self.push_bounded(data, placeholder.clone());
            closed.push(placeholder);
        }
        self.push_bounded(data, datum);
        closed
    }

    fn push_bounded(&self, data: &mut VecDeque<TimePoint<T>>, point: TimePoint<T>) {
        while data.len() >= self.max_count {
            data.pop_front();
        }
        data.push_back(point);
    }

    /// Whole intervals between the buckets of `prev` and `later`.
    #[must_use]
    pub fn interval_between(&self, prev: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
        let span = self
            .truncate(later)
            .signed_duration_since(self.truncate(prev));
        match (span.num_nanoseconds(), self.step.num_nanoseconds()) {
            (Some(span), Some(step)) => span.checked_div(step).unwrap_or(0),
            _ if span > TimeDelta::zero() => i64::MAX,
            _ => 0,
        }
    }

    /// Whole intervals between the newest point and `time`; zero when empty.
    #[must_use]
    pub fn interval_from_last(&self, time: DateTime<Utc>) -> i64 {
        self.lock()
            .back()
            .map_or(0, |last| self.interval_between(last.time, time))
    }

    fn truncate(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        time.duration_trunc(self.step).unwrap_or(time)
    }

    /// End boundary of the bucket holding `time`.
    fn round_time(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        if self.raw_time {
            return time;
        }
        let start = self.truncate(time);
        start.checked_add_signed(self.step).unwrap_or(start)
    }

    fn rounded<I>(&self, points: I) -> Vec<TimePoint<T>>
    where
        I: IntoIterator<Item = TimePoint<T>>,
    {
        let mut points: Vec<TimePoint<T>> = points.into_iter().collect();
        if let Some(last) = points.last_mut() {
            last.time = self.round_time(last.time);
        }
        points
    }

    #[must_use]
    pub fn last(&self) -> Option<TimePoint<T>> {
        self.last_n(1).pop()
    }

    /// Up to `n` newest points, oldest first.
    #[must_use]
    pub fn last_n(&self, n: usize) -> Vec<TimePoint<T>> {
        if n == 0 {
            return Vec::new();
        }
        let data = self.lock();
        let skip = data.len().saturating_sub(n);
        self.rounded(data.iter().skip(skip).cloned())
    }

    /// Points from the first one stored at or after `time`, tolerating half
    /// an interval of early stamps.
    #[must_use]
    pub fn after(&self, time: DateTime<Utc>) -> Vec<TimePoint<T>> {
        let tick = time.checked_sub_signed(self.half_step).unwrap_or(time);
        let data = self.lock();
        let Some(start) = data.iter().position(|point| point.time >= tick) else {
            return Vec::new();
        };
        self.rounded(data.iter().skip(start).cloned())
    }

    #[must_use]
    pub fn values(&self) -> Vec<TimePoint<T>> {
        let data = self.lock();
        self.rounded(data.iter().cloned())
    }

    #[must_use]
    pub fn snapshot(&self) -> SeriesSnapshot<T> {
        SeriesSnapshot {
            points: self.values(),
            interval: self.interval,
            max_count: self.max_count,
        }
    }

    /// Raw points for persistence; the newest point is not rounded so a
    /// restored series keeps aggregating into the same bucket.
    #[must_use]
    pub fn export(&self) -> SeriesData<T> {
        SeriesData {
            interval: self.interval,
            max_count: self.max_count,
            points: self.lock().iter().cloned().collect(),
        }
    }

    /// Replace the contents with persisted points. Data recorded at a
    /// different interval is ignored and `false` returned.
    pub fn restore(&self, saved: SeriesData<T>) -> bool {
        if saved.interval != self.interval {
            return false;
        }
        let skip = saved.points.len().saturating_sub(self.max_count);
        let mut data = self.lock();
        data.clear();
        data.extend(saved.points.into_iter().skip(skip));
        true
    }

    /// JSON array of `{"ts", "value"}` objects; placeholders carry no value.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_value().to_string()
    }

    pub(crate) fn render_value(&self) -> Value {
        Value::Array(self.values().iter().map(point_json).collect())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<TimePoint<T>>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn point_json<T: SeriesValue>(point: &TimePoint<T>) -> Value {
    let mut object = Map::new();
    object.insert(
        "ts".to_owned(),
        Value::String(point.time.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    if !point.is_placeholder() {
        object.insert("value".to_owned(), point.value.to_json());
    }
    Value::Object(object)
}

impl<T: SeriesValue> fmt::Display for TimeSeries<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl<T: SeriesValue> fmt::Debug for TimeSeries<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeSeries")
            .field("interval", &self.interval)
            .field("max_count", &self.max_count)
            .field("raw_time", &self.raw_time)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl Extension for TimeSeries<f64> {
    fn add(&self, value: f64) {
        TimeSeries::add(self, value);
    }
}
