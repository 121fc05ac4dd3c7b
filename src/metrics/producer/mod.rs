//! Running accumulators and the products they snapshot into.
//!
//! A [`Producer`] tracks running statistics for a stream of marked values.
//! [`Product`] is its immutable, serializable snapshot; the collector keeps
//! one product per time bucket and merges products that land in the same
//! bucket.
mod counter;
mod field_type;
mod gauge;
mod histogram;
mod meter;
mod product;
mod timer;


use std::fmt;

pub use counter::Counter;
pub use field_type::{FieldKind, FieldType, Unit};
pub use gauge::Gauge;
pub use histogram::HistogramProducer;
pub use meter::Meter;
pub use product::{
    CounterProduct, GaugeProduct, HistogramProduct, MeterProduct, Product, TimerProduct,
};
pub use timer::Timer;

pub trait Producer: Send + Sync + fmt::Display {
    /// Record one value.
    fn mark(&self, value: f64);
    /// Headline statistic for the accumulated values.
    fn value(&self) -> f64;
    fn reset(&self);
    /// Snapshot the accumulated state, optionally clearing it atomically.
    fn produce(&self, reset: bool) -> Product;
}
