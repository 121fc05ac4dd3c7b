use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::metrics::histogram::HistogramData;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterProduct {
    pub count: u64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GaugeProduct {
    pub count: u64,
    pub sum: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterProduct {
    pub count: u64,
    pub sum: f64,
    pub first: f64,
    pub last: f64,
    pub min: f64,
    pub max: f64,
}

/// Durations are in nanoseconds; a zero `min` means no sample yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerProduct {
    pub samples: u64,
    pub total: u64,
    pub min: u64,
    pub max: u64,
}

impl TimerProduct {
    #[must_use]
    pub fn mean(&self) -> u64 {
        self.total.checked_div(self.samples).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramProduct {
    pub quantiles: Vec<f64>,
    pub histogram: HistogramData,
}

impl HistogramProduct {
    #[must_use]
    pub fn percentiles(&self) -> Vec<(String, f64)> {
        let values = self.histogram.quantiles(&self.quantiles);
        self.quantiles
            .iter()
            .zip(values)
            .map(|(q, value)| (percentile_label(*q), value))
            .collect()
    }
}

fn percentile_label(q: f64) -> String {
    format!("p{}", (q * 1000.0).round() / 10.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Product {
    Counter(CounterProduct),
    Gauge(GaugeProduct),
    Meter(MeterProduct),
    Timer(TimerProduct),
    Histogram(HistogramProduct),
}

impl Default for Product {
    fn default() -> Self {
        Product::Counter(CounterProduct::default())
    }
}

impl Product {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Product::Counter(_) => "counter",
            Product::Gauge(_) => "gauge",
            Product::Meter(_) => "meter",
            Product::Timer(_) => "timer",
            Product::Histogram(_) => "histogram",
        }
    }

    /// Number of samples folded into this product.
    #[must_use]
    pub fn samples(&self) -> u64 {
        match self {
            Product::Counter(product) => product.count,
            Product::Gauge(product) => product.count,
            Product::Meter(product) => product.count,
            Product::Timer(product) => product.samples,
            Product::Histogram(product) => product.histogram.total().max(0.0).round() as u64,
        }
    }

    /// Headline value: counter sum, gauge/meter latest value, timer mean
    /// nanoseconds, histogram first configured quantile.
    #[must_use]
    pub fn value(&self) -> f64 {
        match self {
            Product::Counter(product) => product.value,
            Product::Gauge(product) => product.value,
            Product::Meter(product) => product.last,
            Product::Timer(product) => nanos_as_f64(product.mean()),
            Product::Histogram(product) => product
                .quantiles
                .first()
                .map(|q| product.histogram.quantile(*q))
                .unwrap_or_default(),
        }
    }

    /// Combine an older and a newer product of the same bucket. Products
    /// of different kinds do not combine; the newer one wins.
    #[must_use]
    pub fn merge(&self, newer: &Product) -> Product {
        match (self, newer) {
            (Product::Counter(older), Product::Counter(newer)) => {
                Product::Counter(CounterProduct {
                    count: older.count.saturating_add(newer.count),
                    value: older.value + newer.value,
                })
            }
            (Product::Gauge(older), Product::Gauge(newer)) => Product::Gauge(GaugeProduct {
                count: older.count.saturating_add(newer.count),
                sum: older.sum + newer.sum,
                value: if newer.count > 0 {
                    newer.value
                } else {
                    older.value
                },
            }),
            (Product::Meter(older), Product::Meter(newer)) => {
                Product::Meter(merge_meter(older, newer))
            }
            (Product::Timer(older), Product::Timer(newer)) => {
                Product::Timer(merge_timer(older, newer))
            }
            (Product::Histogram(older), Product::Histogram(newer)) => {
                let mut histogram = older.histogram.clone();
                histogram.merge(&newer.histogram);
                let quantiles = if older.quantiles.is_empty() {
                    newer.quantiles.clone()
                } else {
                    older.quantiles.clone()
                };
                Product::Histogram(HistogramProduct {
                    quantiles,
                    histogram,
                })
            }
            (_, newer) => newer.clone(),
        }
    }

    /// Flat JSON rendering used by snapshots and outputs.
    #[must_use]
    pub fn summary(&self) -> Value {
        match self {
            Product::Counter(product) => json!({
                "count": product.count,
                "value": product.value,
            }),
            Product::Gauge(product) => json!({
                "count": product.count,
                "sum": product.sum,
                "value": product.value,
            }),
            Product::Meter(product) => json!({
                "count": product.count,
                "sum": product.sum,
                "first": product.first,
                "last": product.last,
                "min": product.min,
                "max": product.max,
            }),
            Product::Timer(product) => json!({
                "samples": product.samples,
                "total": product.total,
                "min": product.min,
                "max": product.max,
            }),
            Product::Histogram(product) => {
                let mut map = Map::new();
                map.insert("count".to_owned(), json!(product.histogram.total()));
                for (label, value) in product.percentiles() {
                    map.insert(label, json!(value));
                }
                Value::Object(map)
            }
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

fn merge_meter(older: &MeterProduct, newer: &MeterProduct) -> MeterProduct {
    if older.count == 0 {
        return *newer;
    }
    if newer.count == 0 {
        return *older;
    }
    MeterProduct {
        count: older.count.saturating_add(newer.count),
        sum: older.sum + newer.sum,
        first: older.first,
        last: newer.last,
        min: older.min.min(newer.min),
        max: older.max.max(newer.max),
    }
}

fn merge_timer(older: &TimerProduct, newer: &TimerProduct) -> TimerProduct {
    let min = match (older.min, newer.min) {
        (0, other) | (other, 0) => other,
        (left, right) => left.min(right),
    };
    TimerProduct {
        samples: older.samples.saturating_add(newer.samples),
        total: older.total.saturating_add(newer.total),
        min,
        max: older.max.max(newer.max),
    }
}

pub(super) const fn nanos_as_f64(nanos: u64) -> f64 {
    nanos as f64
}
