use std::path::Path;

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::error::StorageError;

use super::{Storage, StoredSeries, series_key};

/// Series documents in a single SQLite table keyed by
/// (measurement, field, series).
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// # Errors
    ///
    /// Returns an error when the database cannot be opened or the schema
    /// cannot be created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())
            .await
            .map_err(|source| StorageError::Sqlite {
                context: "open sqlite db",
                source,
            })?;
        Self::initialize(conn).await
    }

    /// # Errors
    ///
    /// Returns an error when the schema cannot be created.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|source| StorageError::Sqlite {
                context: "open in-memory sqlite db",
                source,
            })?;
        Self::initialize(conn).await
    }

    async fn initialize(conn: Connection) -> Result<Self, StorageError> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS series (
                    measurement TEXT NOT NULL,
                    field TEXT NOT NULL,
                    series TEXT NOT NULL,
                    data TEXT NOT NULL,
                    PRIMARY KEY (measurement, field, series)
                );",
            )?;
            Ok(())
        })
        .await
        .map_err(|source| StorageError::Sqlite {
            context: "initialize sqlite db",
            source,
        })?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn load(
        &self,
        measurement: &str,
        field: &str,
        series: &str,
    ) -> Result<Option<StoredSeries>, StorageError> {
        let params = (measurement.to_owned(), field.to_owned(), series.to_owned());
        let document: Option<String> = self
            .conn
            .call(move |conn| {
                let document = conn
                    .query_row(
                        "SELECT data FROM series WHERE measurement = ?1 AND field = ?2 AND series = ?3",
                        rusqlite::params![params.0, params.1, params.2],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(document)
            })
            .await
            .map_err(|source| StorageError::Sqlite {
                context: "load series",
                source,
            })?;
        document
            .map(|document| {
                serde_json::from_str(&document).map_err(|source| StorageError::Decode {
                    key: series_key(measurement, field, series),
                    source,
                })
            })
            .transpose()
    }

    async fn store(
        &self,
        measurement: &str,
        field: &str,
        series: &str,
        data: &StoredSeries,
    ) -> Result<(), StorageError> {
        let document = serde_json::to_string(data).map_err(|source| StorageError::Encode {
            key: series_key(measurement, field, series),
            source,
        })?;
        let params = (measurement.to_owned(), field.to_owned(), series.to_owned());
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO series (measurement, field, series, data)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (measurement, field, series) DO UPDATE SET data = excluded.data",
                    rusqlite::params![params.0, params.1, params.2, document],
                )?;
                Ok(())
            })
            .await
            .map_err(|source| StorageError::Sqlite {
                context: "store series",
                source,
            })
    }
}
