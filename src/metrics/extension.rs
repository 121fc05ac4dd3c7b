use std::sync::Arc;

/// Sink for values marked on an accumulator.
///
/// Histograms and float time series implement this so a counter, gauge,
/// meter or timer can forward every marked value into them transparently.
pub trait Extension: Send + Sync {
    fn add(&self, value: f64);
}

pub type SharedExtension = Arc<dyn Extension>;
