use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::metrics::extension::{Extension, SharedExtension};

use super::{MeterProduct, Producer, Product};

/// Tracks first, last, min, max and sum of marked values.
#[derive(Default)]
pub struct Meter {
    state: Mutex<MeterProduct>,
    extension: Option<SharedExtension>,
}

impl Meter {
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

impl Producer for Meter {
    fn mark(&self, value: f64) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.count == 0 {
                state.first = value;
                state.min = value;
                state.max = value;
            }
            if value < state.min {
                state.min = value;
            }
            if value > state.max {
                state.max = value;
            }
            state.sum += value;
            state.last = value;
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
            .last
    }

    fn reset(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = MeterProduct::default();
    }

    fn produce(&self, reset: bool) -> Product {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let product = *state;
        if reset {
            *state = MeterProduct::default();
        }
        Product::Meter(product)
    }
}

impl Extension for Meter {
    fn add(&self, value: f64) {
        self.mark(value);
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.produce(false))
    }
}
