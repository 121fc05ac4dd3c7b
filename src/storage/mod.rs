//! Durable homes for time-series state.
//!
//! Every series is stored under the triple (measurement, field, series
//! name). A missing entry is not an error; the collector starts such a
//! series empty.
mod file;
mod memory;
mod sqlite;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::metrics::producer::Product;
use crate::metrics::timeseries::SeriesData;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Persisted contents of one collector series.
pub type StoredSeries = SeriesData<Product>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the backend cannot be read or the stored
    /// document cannot be decoded.
    async fn load(
        &self,
        measurement: &str,
        field: &str,
        series: &str,
    ) -> Result<Option<StoredSeries>, StorageError>;

    /// # Errors
    ///
    /// Returns an error when the series cannot be encoded or written.
    async fn store(
        &self,
        measurement: &str,
        field: &str,
        series: &str,
        data: &StoredSeries,
    ) -> Result<(), StorageError>;
}

pub type SharedStorage = Arc<dyn Storage>;

pub(crate) fn series_key(measurement: &str, field: &str, series: &str) -> String {
    format!("{}:{}:{}", measurement, field, series)
}
