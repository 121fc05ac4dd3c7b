//! Aggregation primitives and the collector that drives them.
pub mod clock;
pub mod collector;
pub mod extension;
pub mod histogram;
pub mod producer;
pub mod registry;
pub mod timeseries;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock, system_clock};
pub use collector::{Collector, CollectorConfig, CollectorSeries, Measurement};
pub use histogram::Histogram;
pub use registry::{MemoryRegistry, Registry};
pub use timeseries::{MultiTimeSeries, TimePoint, TimeSeries};
