use thiserror::Error;

use super::{InputError, OutputError};

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Failed to register input: {source}")]
    Registration {
        #[source]
        source: InputError,
    },
    #[error("Failed to initialize output: {source}")]
    OutputInit {
        #[source]
        source: OutputError,
    },
    #[error("Collector is already running.")]
    AlreadyStarted,
    #[error("Collector has been stopped; measurement rejected.")]
    Stopped,
    #[error("Metric '{measurement}:{field}' not found.")]
    MetricNotFound { measurement: String, field: String },
    #[error("Collector requires at least one series.")]
    NoSeries,
    #[error("Series '{name}' must have a non-zero period and max count.")]
    InvalidSeries { name: String },
    #[error("Series '{name}' is defined more than once.")]
    DuplicateSeries { name: String },
    #[error("Queue capacity must be >= 1.")]
    QueueCapacityZero,
    #[error("Sampling interval must be > 0.")]
    SamplingIntervalZero,
    #[error("Collector owner task failed: {source}")]
    Join {
        #[source]
        source: tokio::task::JoinError,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
