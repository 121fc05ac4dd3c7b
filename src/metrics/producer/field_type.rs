use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Counter, Gauge, HistogramProducer, Meter, Producer, Timer};
use crate::metrics::histogram::DEFAULT_MAX_BINS;

const DEFAULT_QUANTILES: [f64; 3] = [0.5, 0.9, 0.99];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[default]
    Short,
    Percent,
    Bytes,
    BytesPerSecond,
    Seconds,
    Milliseconds,
    Nanoseconds,
}

impl Unit {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Unit::Short => "short",
            Unit::Percent => "percent",
            Unit::Bytes => "bytes",
            Unit::BytesPerSecond => "bytes_per_second",
            Unit::Seconds => "seconds",
            Unit::Milliseconds => "milliseconds",
            Unit::Nanoseconds => "nanoseconds",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Counter,
    Gauge,
    Meter,
    Timer,
    Histogram { max_bins: usize, quantiles: Vec<f64> },
}

/// What a field's samples accumulate into, and in which unit.
///
/// Acts as the producer factory: every time bucket of a field starts from
/// a fresh [`FieldType::producer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldType {
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub unit: Unit,
}

impl FieldType {
    /// Samples count and value (sum).
    #[must_use]
    pub const fn counter(unit: Unit) -> Self {
        Self {
            kind: FieldKind::Counter,
            unit,
        }
    }

    /// Samples count, sum and value (last).
    #[must_use]
    pub const fn gauge(unit: Unit) -> Self {
        Self {
            kind: FieldKind::Gauge,
            unit,
        }
    }

    /// Samples count, sum, first, last, min and max.
    #[must_use]
    pub const fn meter(unit: Unit) -> Self {
        Self {
            kind: FieldKind::Meter,
            unit,
        }
    }

    /// Samples count, total, min and max durations.
    #[must_use]
    pub const fn timer(unit: Unit) -> Self {
        Self {
            kind: FieldKind::Timer,
            unit,
        }
    }

    /// p50, p90 and p99 over at most 100 bins.
    #[must_use]
    pub fn histogram(unit: Unit) -> Self {
        Self::histogram_percentiles(unit, DEFAULT_MAX_BINS, &DEFAULT_QUANTILES)
    }

    #[must_use]
    pub fn histogram_percentiles(unit: Unit, max_bins: usize, quantiles: &[f64]) -> Self {
        Self {
            kind: FieldKind::Histogram {
                max_bins,
                quantiles: quantiles.to_vec(),
            },
            unit,
        }
    }

    #[must_use]
    pub fn producer(&self) -> Box<dyn Producer> {
        match &self.kind {
            FieldKind::Counter => Box::new(Counter::new()),
            FieldKind::Gauge => Box::new(Gauge::new()),
            FieldKind::Meter => Box::new(Meter::new()),
            FieldKind::Timer => Box::new(Timer::new()),
            FieldKind::Histogram {
                max_bins,
                quantiles,
            } => Box::new(HistogramProducer::new(*max_bins, quantiles)),
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self.kind {
            FieldKind::Counter => "counter",
            FieldKind::Gauge => "gauge",
            FieldKind::Meter => "meter",
            FieldKind::Timer => "timer",
            FieldKind::Histogram { .. } => "histogram",
        }
    }

    #[must_use]
    pub const fn unit(&self) -> Unit {
        self.unit
    }
}

impl Default for FieldType {
    fn default() -> Self {
        Self::gauge(Unit::Short)
    }
}
