use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{SeriesMeta, SeriesValue, TimeSeries};

/// Several resolutions of one input stream. Every sample is fanned out to
/// each series, which aggregates it under its own interval and rules.
pub struct MultiTimeSeries<T> {
    series: Vec<TimeSeries<T>>,
}

impl<T: SeriesValue> MultiTimeSeries<T> {
    #[must_use]
    pub const fn new(series: Vec<TimeSeries<T>>) -> Self {
        Self { series }
    }

    pub fn add(&self, value: T) {
        for series in &self.series {
            series.add(value.clone());
        }
    }

    pub fn add_time(&self, time: DateTime<Utc>, value: T) {
        for series in &self.series {
            series.add_time(time, value.clone());
        }
    }

    pub fn set_meta(&mut self, meta: Option<SeriesMeta>) {
        for series in &mut self.series {
            series.set_meta(meta.clone());
        }
    }

    #[must_use]
    pub fn series(&self) -> &[TimeSeries<T>] {
        &self.series
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TimeSeries<T>> {
        self.series.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// JSON array holding one rendered array per resolution.
    #[must_use]
    pub fn render(&self) -> String {
        Value::Array(self.series.iter().map(TimeSeries::render_value).collect()).to_string()
    }
}

impl<T: SeriesValue> fmt::Display for MultiTimeSeries<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl<T: SeriesValue> fmt::Debug for MultiTimeSeries<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.series).finish()
    }
}
