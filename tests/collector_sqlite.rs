use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tempfile::tempdir;

use metric_rollup::metrics::collector::{
    Collector, CollectorConfig, CollectorSeries, Measurement, Record,
};
use metric_rollup::metrics::producer::{FieldType, GaugeProduct, Product, Unit};
use metric_rollup::storage::{SqliteStorage, Storage};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const POLL_ATTEMPTS: usize = 400;

fn config() -> CollectorConfig {
    CollectorConfig {
        sampling_interval: Duration::from_secs(3600),
        series: vec![
            CollectorSeries::new("1m/1s", Duration::from_secs(1), 60),
            CollectorSeries::new("1h/1m", Duration::from_secs(60), 60),
        ],
        ..CollectorConfig::default()
    }
}

fn base_time() -> Result<DateTime<Utc>, String> {
    Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0)
        .single()
        .ok_or_else(|| "invalid timestamp".to_owned())
}

fn user_cpu(time: DateTime<Utc>, value: f64) -> Measurement {
    Measurement::new("cpu")
        .with_time(time)
        .with_field("user", value, FieldType::gauge(Unit::Percent))
}

async fn open_collector(path: &Path) -> Result<Collector, String> {
    let storage = SqliteStorage::open(path)
        .await
        .map_err(|err| format!("open sqlite failed: {}", err))?;
    let mut collector = Collector::new(config())
        .map_err(|err| format!("collector config rejected: {}", err))?
        .with_storage(Arc::new(storage));
    collector
        .start()
        .map_err(|err| format!("start failed: {}", err))?;
    Ok(collector)
}

async fn wait_for_inflight(
    collector: &Collector,
    expected_count: u64,
) -> Result<BTreeMap<String, Record>, String> {
    for _ in 0..POLL_ATTEMPTS {
        if let Ok(records) = collector.inflight("cpu", "user")
            && records.values().all(|record| {
                matches!(&record.value, Some(Product::Gauge(gauge)) if gauge.count >= expected_count)
            })
        {
            return Ok(records);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    Err("collector never ingested the measurement".to_owned())
}

fn expect_record(
    records: &BTreeMap<String, Record>,
    series: &str,
    time: DateTime<Utc>,
    gauge: GaugeProduct,
) -> Result<(), String> {
    let record = records
        .get(series)
        .ok_or_else(|| format!("missing series {}", series))?;
    if record.time != time || record.value != Some(Product::Gauge(gauge)) || record.is_null {
        return Err(format!("unexpected {} record {:?}", series, record));
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn series_survive_a_restart_through_sqlite() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("rollup.db");
    let start = base_time()?;

    let first = open_collector(&path).await?;
    for (offset_ms, value) in [(200, 1.0), (700, 3.0), (1500, 5.0)] {
        first
            .send(user_cpu(start + TimeDelta::milliseconds(offset_ms), value))
            .await
            .map_err(|err| format!("send failed: {}", err))?;
    }
    first
        .stop()
        .await
        .map_err(|err| format!("stop failed: {}", err))?;

    let storage = SqliteStorage::open(&path)
        .await
        .map_err(|err| format!("reopen sqlite failed: {}", err))?;
    let stored = storage
        .load("cpu", "user", "1m/1s")
        .await
        .map_err(|err| format!("load failed: {}", err))?
        .ok_or("per-second series was not persisted")?;
    if stored.points.len() != 2 {
        return Err(format!("expected 2 stored points, got {:?}", stored.points));
    }
    drop(storage);

    let second = open_collector(&path).await?;
    second
        .send(user_cpu(start + TimeDelta::milliseconds(1800), 7.0))
        .await
        .map_err(|err| format!("send failed: {}", err))?;
    let records = wait_for_inflight(&second, 2).await?;

    expect_record(
        &records,
        "1m/1s",
        start + TimeDelta::seconds(2),
        GaugeProduct {
            count: 2,
            sum: 12.0,
            value: 7.0,
        },
    )?;
    expect_record(
        &records,
        "1h/1m",
        start + TimeDelta::seconds(60),
        GaugeProduct {
            count: 4,
            sum: 16.0,
            value: 7.0,
        },
    )?;

    let series = second
        .timeseries("cpu", "user")
        .ok_or("series should be routed after ingestion")?;
    let per_second = series
        .get(0)
        .ok_or("missing per-second resolution")?
        .values();
    let times: Vec<DateTime<Utc>> = per_second.iter().map(|point| point.time).collect();
    if times != [start + TimeDelta::seconds(1), start + TimeDelta::seconds(2)] {
        return Err(format!("unexpected per-second times {:?}", times));
    }

    second
        .stop()
        .await
        .map_err(|err| format!("stop failed: {}", err))
}
