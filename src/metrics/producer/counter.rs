use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::metrics::extension::{Extension, SharedExtension};

use super::{CounterProduct, Producer, Product};

/// Sums marked values.
#[derive(Default)]
pub struct Counter {
    state: Mutex<CounterProduct>,
    extension: Option<SharedExtension>,
}

impl Counter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_extension(mut self, extension: SharedExtension) -> Self {
        self.extension = Some(extension);
        self
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .count
    }
}

impl Producer for Counter {
    fn mark(&self, value: f64) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.value += value;
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
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = CounterProduct::default();
    }

    fn produce(&self, reset: bool) -> Product {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let product = *state;
        if reset {
            *state = CounterProduct::default();
        }
        Product::Counter(product)
    }
}

impl Extension for Counter {
    fn add(&self, value: f64) {
        self.mark(value);
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.produce(false))
    }
}
