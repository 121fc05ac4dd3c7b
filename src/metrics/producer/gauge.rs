use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::metrics::extension::{Extension, SharedExtension};

use super::{GaugeProduct, Producer, Product};

/// Keeps the latest value alongside the running count and sum.
#[derive(Default)]
pub struct Gauge {
    state: Mutex<GaugeProduct>,
    extension: Option<SharedExtension>,
}

impl Gauge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_extension(mut self, extension: SharedExtension) -> Self {
        self.extension = Some(extension);
        self
    }
}

impl Producer for Gauge {
    fn mark(&self, value: f64) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.value = value;
            state.sum += value;
            state.count = state.count.saturating_add(1);
        }
        if let Some(extension) = self.extension.as_ref() {
            extension.add(value);
        }
    }

    fn value(&self) -> f64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
    }

    fn reset(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = GaugeProduct::default();
    }

    fn produce(&self, reset: bool) -> Product {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let product = *state;
        if reset {
            *state = GaugeProduct::default();
        }
        Product::Gauge(product)
    }
}

impl Extension for Gauge {
    fn add(&self, value: f64) {
        self.mark(value);
    }
}

impl fmt::Display for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.produce(false))
    }
}
