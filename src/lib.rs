//! Core library for the `metric-rollup` collector.
//!
//! The building blocks are usable on their own: a bounded-memory quantile
//! [`metrics::Histogram`], rolling interval-aligned
//! [`metrics::TimeSeries`], and a single-owner [`metrics::Collector`] that
//! routes measurements from inputs into per-field series, persists them
//! through a [`storage::Storage`] backend and pushes closed buckets to
//! outputs. The `metric-rollup` binary wires these together from a config
//! file.
pub mod args;
pub mod config;
pub mod error;
pub mod inputs;
pub mod metrics;
pub mod outputs;
pub mod storage;
