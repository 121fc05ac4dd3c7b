use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::error::OutputError;
use crate::metrics::collector::{Output, Record};

/// Appends one JSON document per closed bucket to a file.
///
/// Records go into a `BufWriter`, so `process` only touches the file when
/// the buffer fills. The file is opened by `init` and flushed by `deinit`;
/// records processed outside that window are dropped.
#[derive(Debug)]
pub struct JsonLinesOutput {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl JsonLinesOutput {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            writer: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl Output for JsonLinesOutput {
    async fn init(&self) -> Result<(), OutputError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| OutputError::Open {
                path: self.path.clone(),
                source,
            })?;
        *self.writer() = Some(BufWriter::new(file));
        Ok(())
    }

    fn process(&self, record: &Record) {
        let mut writer = self.writer();
        let Some(writer) = writer.as_mut() else {
            return;
        };
        let written = serde_json::to_writer(&mut *writer, record)
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"));
        if let Err(err) = written {
            warn!("Failed to write record to {}: {}", self.path.display(), err);
        }
    }

    async fn deinit(&self) -> Result<(), OutputError> {
        let Some(mut writer) = self.writer().take() else {
            return Ok(());
        };
        writer.flush().map_err(|source| OutputError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    use super::*;
    use crate::error::{AppError, AppResult};
    use crate::metrics::collector::{CollectorSeries, FieldInfo};
    use crate::metrics::producer::{CounterProduct, FieldType, Product, Unit};
    use crate::metrics::timeseries::TimePoint;

    fn sample_info() -> FieldInfo {
        let series = CollectorSeries::new("1m/1s", Duration::from_secs(1), 60);
        FieldInfo::new("net", "rx", &series, &FieldType::counter(Unit::Bytes))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn writes_one_document_per_record() -> AppResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("records.jsonl");
        let output = JsonLinesOutput::new(path.clone());
        let time = Utc
            .with_ymd_and_hms(2024, 5, 1, 8, 0, 1)
            .single()
            .ok_or_else(|| AppError::validation("invalid timestamp"))?;
        let info = sample_info();

        output.process(&Record::new(
            &TimePoint::new(time, Product::Counter(CounterProduct { count: 9, value: 9.0 })),
            &info,
        ));
        output.init().await?;
        output.process(&Record::new(
            &TimePoint::new(time, Product::Counter(CounterProduct { count: 2, value: 512.0 })),
            &info,
        ));
        output.process(&Record::new(&TimePoint::placeholder(time), &info));
        output.deinit().await?;

        let contents = std::fs::read_to_string(&path)?;
        let lines: Vec<Value> = contents
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        if lines.len() != 2 {
            return Err(AppError::validation(format!(
                "expected 2 records, got {}",
                lines.len()
            )));
        }
        let first = lines
            .first()
            .ok_or_else(|| AppError::validation("missing first record"))?;
        if first.get("ts") != Some(&Value::from("2024-05-01T08:00:01Z"))
            || first.pointer("/value/value") != Some(&Value::from(512.0))
            || first.get("unit") != Some(&Value::from("bytes"))
        {
            return Err(AppError::validation(format!("unexpected record {}", first)));
        }
        let second = lines
            .get(1)
            .ok_or_else(|| AppError::validation("missing second record"))?;
        if second.get("is_null") != Some(&Value::Bool(true)) || second.get("value").is_some() {
            return Err(AppError::validation(format!(
                "placeholder should carry no value: {}",
                second
            )));
        }
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn init_reports_unopenable_path() -> AppResult<()> {
        let dir = tempfile::tempdir()?;
        let output = JsonLinesOutput::new(dir.path().join("missing").join("records.jsonl"));
        match output.init().await {
            Err(OutputError::Open { path, .. }) if path == output.path() => Ok(()),
            other => Err(AppError::validation(format!(
                "expected open failure, got {:?}",
                other
            ))),
        }
    }
}
