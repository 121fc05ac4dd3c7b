use std::future::Future;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use super::*;
use crate::error::{AppError, AppResult};
use crate::metrics::producer::{CounterProduct, Product};
use crate::metrics::timeseries::TimePoint;

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::storage(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn sample_series(value: f64) -> AppResult<StoredSeries> {
    let time = Utc
        .with_ymd_and_hms(2024, 5, 1, 8, 30, 0)
        .single()
        .ok_or_else(|| AppError::storage("invalid timestamp"))?;
    Ok(StoredSeries {
        interval: Duration::from_secs(10),
        max_count: 60,
        points: vec![TimePoint {
            time,
            value: Product::Counter(CounterProduct { count: 3, value }),
            count: 3,
        }],
    })
}

async fn expect_round_trip(storage: &dyn Storage) -> AppResult<()> {
    if storage.load("load", "load1", "10m/10s").await?.is_some() {
        return Err(AppError::storage("unknown series must load as absent"));
    }

    storage
        .store("load", "load1", "10m/10s", &sample_series(1.5)?)
        .await?;
    storage
        .store("load", "load1", "10m/10s", &sample_series(4.0)?)
        .await?;
    storage
        .store("load", "load5", "10m/10s", &sample_series(9.0)?)
        .await?;

    let loaded = storage
        .load("load", "load1", "10m/10s")
        .await?
        .ok_or_else(|| AppError::storage("stored series missing"))?;
    if loaded != sample_series(4.0)? {
        return Err(AppError::storage(format!(
            "latest store must win, got {:?}",
            loaded
        )));
    }
    Ok(())
}

#[test]
fn memory_storage_keeps_latest_document() -> AppResult<()> {
    run_async_test(async {
        let storage = MemoryStorage::new();
        expect_round_trip(&storage).await?;
        if storage.len() != 2 {
            return Err(AppError::storage(format!(
                "expected 2 entries, got {}",
                storage.len()
            )));
        }
        Ok(())
    })
}

#[test]
fn file_storage_writes_encoded_paths() -> AppResult<()> {
    run_async_test(async {
        let dir = tempfile::tempdir()?;
        let storage = FileStorage::new(dir.path());
        expect_round_trip(&storage).await?;

        let path = storage.path_for("load", "load1", "10m/10s");
        if path != dir.path().join("load").join("load1").join("10m%2F10s.json") {
            return Err(AppError::storage(format!("unexpected path {}", path.display())));
        }
        if !path.exists() {
            return Err(AppError::storage("series document was not written"));
        }

        let escaped = storage.path_for("..", "a/b", "");
        if !escaped.starts_with(dir.path()) || escaped.components().count() != dir.path().components().count() + 3 {
            return Err(AppError::storage(format!(
                "path escaped the root: {}",
                escaped.display()
            )));
        }

        let pairs = [("cpu usage", "cpu_usage"), ("a/b", "a_b"), ("", "%"), ("%25", "%")];
        for (left, right) in pairs {
            if storage.path_for("m", left, "s") == storage.path_for("m", right, "s") {
                return Err(AppError::storage(format!(
                    "fields {:?} and {:?} share a path",
                    left, right
                )));
            }
        }

        storage.store("cpu", "cpu usage", "s", &sample_series(1.0)?).await?;
        storage.store("cpu", "cpu_usage", "s", &sample_series(2.0)?).await?;
        let spaced = storage.load("cpu", "cpu usage", "s").await?;
        if spaced != Some(sample_series(1.0)?) {
            return Err(AppError::storage(format!(
                "similar names overwrote each other: {:?}",
                spaced
            )));
        }
        Ok(())
    })
}

#[test]
fn file_storage_reports_corrupt_documents() -> AppResult<()> {
    run_async_test(async {
        let dir = tempfile::tempdir()?;
        let storage = FileStorage::new(dir.path());
        let path = storage.path_for("process", "rss", "1h/1m");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, b"not json")?;

        match storage.load("process", "rss", "1h/1m").await {
            Err(StorageError::Decode { key, .. }) if key == "process:rss:1h/1m" => Ok(()),
            other => Err(AppError::storage(format!(
                "expected decode error, got {:?}",
                other
            ))),
        }
    })
}

#[test]
fn sqlite_storage_upserts_by_series_key() -> AppResult<()> {
    run_async_test(async {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("rollup.db");
        {
            let storage = SqliteStorage::open(&db_path).await?;
            expect_round_trip(&storage).await?;
        }

        let reopened = SqliteStorage::open(&db_path).await?;
        let loaded = reopened.load("load", "load5", "10m/10s").await?;
        if loaded != Some(sample_series(9.0)?) {
            return Err(AppError::storage(format!(
                "reopened database lost data: {:?}",
                loaded
            )));
        }
        Ok(())
    })
}
