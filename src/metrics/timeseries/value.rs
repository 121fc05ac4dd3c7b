use serde_json::{Value, json};

use crate::metrics::producer::Product;

/// Value type a time series can hold and render.
pub trait SeriesValue: Clone + Default + Send + 'static {
    fn to_json(&self) -> Value;
}

impl SeriesValue for f64 {
    fn to_json(&self) -> Value {
        json!(self)
    }
}

impl SeriesValue for i64 {
    fn to_json(&self) -> Value {
        json!(self)
    }
}

impl SeriesValue for Product {
    fn to_json(&self) -> Value {
        self.summary()
    }
}

/// Numeric series values, required by the arithmetic aggregators.
pub trait Numeric: SeriesValue + Copy + PartialOrd {
    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
    fn plus(self, other: Self) -> Self;
}

impl Numeric for f64 {
    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn plus(self, other: Self) -> Self {
        self + other
    }
}

impl Numeric for i64 {
    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as i64
    }

    fn plus(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}
