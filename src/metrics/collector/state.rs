use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::metrics::clock::SharedClock;
use crate::metrics::producer::{FieldType, Product};
use crate::metrics::registry::{SharedRegistry, public_name};
use crate::metrics::timeseries::{
    Aggregator, MultiTimeSeries, SeriesMeta, TimePoint, TimeSeries,
};
use crate::storage::SharedStorage;

use super::output::{FieldInfo, FieldListener, Record, SharedOutput};
use super::{CollectorSeries, Field, Inbound, Measurement};

pub type FieldSeries = MultiTimeSeries<Product>;

/// A field's series across all resolutions plus the type it was created
/// with.
#[derive(Clone)]
pub(crate) struct FieldRoute {
    pub(crate) field_type: FieldType,
    pub(crate) series: Arc<FieldSeries>,
}

/// measurement -> field -> route. Only the owner task inserts.
pub(crate) type RouteTable = BTreeMap<String, BTreeMap<String, FieldRoute>>;
pub(crate) type SharedRoutes = Arc<RwLock<RouteTable>>;

/// Where closed buckets go.
#[derive(Default)]
pub(crate) struct CloseSink {
    pub(crate) listener: Option<FieldListener>,
    pub(crate) outputs: Vec<SharedOutput>,
}

impl CloseSink {
    fn emit(&self, point: &TimePoint<Product>, info: &FieldInfo) {
        if let Some(listener) = self.listener.as_ref() {
            listener(point, info);
        }
        if self.outputs.is_empty() {
            return;
        }
        let record = Record::new(point, info);
        for output in &self.outputs {
            output.process(&record);
        }
    }
}

/// Owner-side ingestion state. Everything here runs on the collector's
/// owner task, one message at a time.
pub(crate) struct Ingest {
    pub(crate) series: Arc<[CollectorSeries]>,
    pub(crate) prefix: Option<String>,
    pub(crate) clock: SharedClock,
    pub(crate) storage: Option<SharedStorage>,
    pub(crate) registry: SharedRegistry,
    pub(crate) sink: Arc<CloseSink>,
    pub(crate) routes: SharedRoutes,
}

impl Ingest {
    pub(crate) async fn receive(&self, inbound: Inbound) {
        match inbound {
            Inbound::Measurement(measurement) => self.ingest(measurement).await,
            Inbound::Sync(time) => {
                debug!("Sync marker for tick at {}", time);
                self.sync().await;
            }
        }
    }

    async fn ingest(&self, measurement: Measurement) {
        let Measurement { name, time, fields } = measurement;
        let time = time.unwrap_or_else(|| self.clock.now());
        for field in fields {
            // JSON has no encoding for inf or NaN; a stored bucket holding
            // one could never be loaded again.
            if !field.value.is_finite() {
                warn!(
                    "Dropping non-finite value {} for {}:{}",
                    field.value, name, field.name
                );
                continue;
            }
            let route = match lookup(&self.routes, &name, &field.name) {
                Some(route) => route,
                None => self.create(&name, &field).await,
            };
            let producer = field.field_type.producer();
            producer.mark(field.value);
            route.series.add_time(time, producer.produce(false));
        }
    }

    async fn create(&self, measurement: &str, field: &Field) -> FieldRoute {
        let title = public_name(self.prefix.as_deref(), measurement, &field.name);
        let resolutions = self
            .series
            .iter()
            .map(|resolution| {
                let info = FieldInfo::new(measurement, &field.name, resolution, &field.field_type);
                let sink = Arc::clone(&self.sink);
                TimeSeries::new(
                    resolution.period,
                    resolution.max_count,
                    Some(merge_products as Aggregator<Product>),
                )
                .with_clock(Arc::clone(&self.clock))
                .with_listener(Arc::new(move |point: &TimePoint<Product>| {
                    sink.emit(point, &info);
                }))
            })
            .collect();
        let mut multi = MultiTimeSeries::new(resolutions);
        multi.set_meta(Some(SeriesMeta {
            title: title.clone(),
            unit: field.field_type.unit().to_string(),
        }));

        if let Some(storage) = self.storage.as_ref() {
            for (resolution, series) in self.series.iter().zip(multi.series()) {
                match storage
                    .load(measurement, &field.name, &resolution.name)
                    .await
                {
                    Ok(Some(saved)) => {
                        if !series.restore(saved) {
                            debug!(
                                "Stored series {} {} has a different interval; starting empty",
                                title, resolution.name
                            );
                        }
                    }
                    Ok(None) => {}
                    Err(err) => warn!(
                        "Failed to load time series for {} {}: {}",
                        title, resolution.name, err
                    ),
                }
            }
        }

        let route = FieldRoute {
            field_type: field.field_type.clone(),
            series: Arc::new(multi),
        };
        {
            let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
            routes
                .entry(measurement.to_owned())
                .or_default()
                .insert(field.name.clone(), route.clone());
        }
        self.registry.publish(&title, route.series.clone());
        debug!("Created series for {}", title);
        route
    }

    /// Persist every resolution of every field. A failed store is logged
    /// and the pass continues.
    pub(crate) async fn sync(&self) {
        let Some(storage) = self.storage.as_ref() else {
            return;
        };
        let snapshot: Vec<(String, String, Arc<FieldSeries>)> = {
            let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
            routes
                .iter()
                .flat_map(|(measurement, fields)| {
                    fields.iter().map(move |(field, route)| {
                        (measurement.clone(), field.clone(), route.series.clone())
                    })
                })
                .collect()
        };

        let mut stored = 0usize;
        for (measurement, field, multi) in &snapshot {
            for (resolution, series) in self.series.iter().zip(multi.series()) {
                let data = series.export();
                match storage
                    .store(measurement, field, &resolution.name, &data)
                    .await
                {
                    Ok(()) => stored = stored.saturating_add(1),
                    Err(err) => warn!(
                        "Failed to store time series for {}:{} {}: {}",
                        measurement, field, resolution.name, err
                    ),
                }
            }
        }
        debug!("Synced {} series to storage", stored);
    }
}

pub(crate) fn lookup(routes: &SharedRoutes, measurement: &str, field: &str) -> Option<FieldRoute> {
    let routes = routes.read().unwrap_or_else(PoisonError::into_inner);
    routes.get(measurement)?.get(field).cloned()
}

/// Bucket aggregator for collector series: products of one bucket merge in
/// arrival order.
pub(crate) fn merge_products(
    older: &TimePoint<Product>,
    newer: &TimePoint<Product>,
) -> TimePoint<Product> {
    if older.is_placeholder() {
        return newer.clone();
    }
    TimePoint {
        time: older.time.max(newer.time),
        value: older.value.merge(&newer.value),
        count: older.count.saturating_add(newer.count),
    }
}
