use std::fmt;

use crate::metrics::extension::{Extension, SharedExtension};
use crate::metrics::histogram::Histogram;

use super::{HistogramProduct, Producer, Product};

/// Histogram accumulator reporting a fixed set of quantiles.
pub struct HistogramProducer {
    histogram: Histogram,
    quantiles: Vec<f64>,
    extension: Option<SharedExtension>,
}

impl HistogramProducer {
    #[must_use]
    pub fn new(max_bins: usize, quantiles: &[f64]) -> Self {
        Self {
            histogram: Histogram::new(max_bins),
            quantiles: quantiles.to_vec(),
            extension: None,
        }
    }

    #[must_use]
    pub fn with_extension(mut self, extension: SharedExtension) -> Self {
        self.extension = Some(extension);
        self
    }

    #[must_use]
    pub fn quantiles(&self) -> Vec<f64> {
        self.histogram.quantiles(&self.quantiles)
    }
}

impl Producer for HistogramProducer {
    fn mark(&self, value: f64) {
        self.histogram.add(value);
        if let Some(extension) = self.extension.as_ref() {
            extension.add(value);
        }
    }

    fn value(&self) -> f64 {
        self.quantiles
            .first()
            .map(|q| self.histogram.quantile(*q))
            .unwrap_or_default()
    }

    fn reset(&self) {
        self.histogram.reset();
    }

    fn produce(&self, reset: bool) -> Product {
        Product::Histogram(HistogramProduct {
            quantiles: self.quantiles.clone(),
            histogram: self.histogram.take(reset),
        })
    }
}

impl Extension for HistogramProducer {
    fn add(&self, value: f64) {
        self.mark(value);
    }
}

impl fmt::Display for HistogramProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.produce(false))
    }
}
