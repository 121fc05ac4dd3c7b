use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::metrics::extension::{Extension, SharedExtension};

use super::product::nanos_as_f64;
use super::{Producer, Product, TimerProduct};

/// Accumulates durations. Marked `f64` values are nanoseconds.
#[derive(Default)]
pub struct Timer {
    state: Mutex<TimerProduct>,
    extension: Option<SharedExtension>,
}

impl Timer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_extension(mut self, extension: SharedExtension) -> Self {
        self.extension = Some(extension);
        self
    }

    pub fn mark_duration(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.samples = state.samples.saturating_add(1);
            state.total = state.total.saturating_add(nanos);
            if state.min == 0 || nanos < state.min {
                state.min = nanos;
            }
            if nanos > state.max {
                state.max = nanos;
            }
        }
        if let Some(extension) = self.extension.as_ref() {
            extension.add(nanos_as_f64(nanos));
        }
    }

    #[must_use]
    pub fn mean(&self) -> Duration {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Duration::from_nanos(state.mean())
    }
}

impl Producer for Timer {
    fn mark(&self, value: f64) {
        let nanos = if value.is_finite() && value > 0.0 {
            value as u64
        } else {
            0
        };
        self.mark_duration(Duration::from_nanos(nanos));
    }

    fn value(&self) -> f64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        nanos_as_f64(state.mean())
    }

    fn reset(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = TimerProduct::default();
    }

    fn produce(&self, reset: bool) -> Product {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let product = *state;
        if reset {
            *state = TimerProduct::default();
        }
        Product::Timer(product)
    }
}

impl Extension for Timer {
    fn add(&self, value: f64) {
        self.mark(value);
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.produce(false))
    }
}
