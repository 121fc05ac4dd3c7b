use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::OutputError;
use crate::metrics::producer::{FieldType, Product, Unit};
use crate::metrics::timeseries::TimePoint;

use super::CollectorSeries;

/// Identifies the series a closed bucket belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    pub measure: String,
    pub name: String,
    pub series: String,
    #[serde(serialize_with = "serialize_period")]
    pub period: Duration,
    #[serde(rename = "type")]
    pub type_label: &'static str,
    pub unit: Unit,
}

impl FieldInfo {
    pub(crate) fn new(
        measure: &str,
        name: &str,
        series: &CollectorSeries,
        field_type: &FieldType,
    ) -> Self {
        Self {
            measure: measure.to_owned(),
            name: name.to_owned(),
            series: series.name.clone(),
            period: series.period,
            type_label: field_type.label(),
            unit: field_type.unit(),
        }
    }
}

/// A bucket as handed to outputs. Placeholder buckets carry no value and
/// have `is_null` set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub measure: String,
    pub name: String,
    #[serde(rename = "ts")]
    pub time: DateTime<Utc>,
    #[serde(
        serialize_with = "serialize_summary",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Product>,
    pub is_null: bool,
    pub series: String,
    #[serde(serialize_with = "serialize_period")]
    pub period: Duration,
    #[serde(rename = "type")]
    pub type_label: &'static str,
    pub unit: Unit,
}

impl Record {
    #[must_use]
    pub fn new(point: &TimePoint<Product>, info: &FieldInfo) -> Self {
        let value = if point.is_placeholder() {
            None
        } else {
            Some(point.value.clone())
        };
        Self {
            measure: info.measure.clone(),
            name: info.name.clone(),
            time: point.time,
            is_null: value.is_none(),
            value,
            series: info.series.clone(),
            period: info.period,
            type_label: info.type_label,
            unit: info.unit,
        }
    }
}

fn serialize_period<S: Serializer>(period: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(period.as_millis()).unwrap_or(u64::MAX))
}

fn serialize_summary<S: Serializer>(
    value: &Option<Product>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(product) => product.summary().serialize(serializer),
        None => serializer.serialize_none(),
    }
}

/// Push destination for closed buckets.
///
/// `process` runs on the collector's owner task. It must not wait on other
/// tasks or the network; a write into an in-process buffer is acceptable.
#[async_trait]
pub trait Output: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the destination cannot be prepared; the
    /// output is then not registered.
    async fn init(&self) -> Result<(), OutputError> {
        Ok(())
    }

    fn process(&self, record: &Record);

    /// # Errors
    ///
    /// Returns an error when flushing or closing the destination fails.
    async fn deinit(&self) -> Result<(), OutputError> {
        Ok(())
    }
}

pub type SharedOutput = Arc<dyn Output>;

/// Invoked with every closed bucket of every field and resolution.
pub type FieldListener = Arc<dyn Fn(&TimePoint<Product>, &FieldInfo) + Send + Sync>;

/// Adapts a plain function into an [`Output`].
pub struct OutputFn<F> {
    process: F,
}

impl<F> OutputFn<F>
where
    F: Fn(&Record) + Send + Sync,
{
    pub const fn new(process: F) -> Self {
        Self { process }
    }
}

#[async_trait]
impl<F> Output for OutputFn<F>
where
    F: Fn(&Record) + Send + Sync,
{
    fn process(&self, record: &Record) {
        (self.process)(record);
    }
}
