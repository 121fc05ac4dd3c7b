//! Named, discoverable renderings of live series.
//!
//! The collector publishes every field it creates under a public name so a
//! snapshot can be produced without going through the collector itself.

use std::sync::Arc;

use dashmap::DashMap;

use super::timeseries::{MultiTimeSeries, SeriesValue, TimeSeries};

/// Anything that renders itself as a JSON document.
pub trait Render: Send + Sync {
    fn render(&self) -> String;
}

pub type SharedRender = Arc<dyn Render>;

impl<T: SeriesValue> Render for TimeSeries<T> {
    fn render(&self) -> String {
        TimeSeries::render(self)
    }
}

impl<T: SeriesValue> Render for MultiTimeSeries<T> {
    fn render(&self) -> String {
        MultiTimeSeries::render(self)
    }
}

pub trait Registry: Send + Sync {
    /// Publish `target` under `name`, replacing any previous entry.
    fn publish(&self, name: &str, target: SharedRender);
    fn get(&self, name: &str) -> Option<SharedRender>;
    /// Published names in ascending order.
    fn names(&self) -> Vec<String>;

    fn render(&self, name: &str) -> Option<String> {
        self.get(name).map(|target| target.render())
    }
}

pub type SharedRegistry = Arc<dyn Registry>;

#[derive(Default)]
pub struct MemoryRegistry {
    entries: DashMap<String, SharedRender>,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Registry for MemoryRegistry {
    fn publish(&self, name: &str, target: SharedRender) {
        self.entries.insert(name.to_owned(), target);
    }

    fn get(&self, name: &str) -> Option<SharedRender> {
        self.entries.get(name).map(|entry| Arc::clone(entry.value()))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}

/// `[prefix:]measurement:field`
#[must_use]
pub fn public_name(prefix: Option<&str>, measurement: &str, field: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}:{}", prefix, measurement, field),
        _ => format!("{}:{}", measurement, field),
    }
}
