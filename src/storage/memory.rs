use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::StorageError;

use super::{Storage, StoredSeries};

type Key = (String, String, String);

/// Process-local storage; state survives collector restarts within one run.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<Key, StoredSeries>,
}

impl MemoryStorage {
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

    #[must_use]
    pub fn get(&self, measurement: &str, field: &str, series: &str) -> Option<StoredSeries> {
        self.entries
            .get(&key(measurement, field, series))
            .map(|entry| entry.value().clone())
    }
}

fn key(measurement: &str, field: &str, series: &str) -> Key {
    (measurement.to_owned(), field.to_owned(), series.to_owned())
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(
        &self,
        measurement: &str,
        field: &str,
        series: &str,
    ) -> Result<Option<StoredSeries>, StorageError> {
        Ok(self.get(measurement, field, series))
    }

    async fn store(
        &self,
        measurement: &str,
        field: &str,
        series: &str,
        data: &StoredSeries,
    ) -> Result<(), StorageError> {
        self.entries
            .insert(key(measurement, field, series), data.clone());
        Ok(())
    }
}
