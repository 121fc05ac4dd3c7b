//! Sampling, routing and persistence of per-field time series.
//!
//! A single owner task consumes one ordered stream built from three
//! sources: the stop signal, the inbound measurement queue and the sampling
//! ticker, in that priority. Only the owner creates routes and writes to
//! series. Each tick gathers inputs on its own task and feeds the results
//! back through the same queue, followed by a sync marker, so slow inputs
//! never stall ingestion.
mod input;
mod measurement;
mod output;
mod state;


use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::{CollectorError, InputError};
use crate::metrics::clock::{SharedClock, system_clock};
use crate::metrics::registry::{MemoryRegistry, SharedRegistry, public_name};
use crate::storage::SharedStorage;

pub use input::{Input, InputFn, SharedInput};
pub use measurement::{Field, Measurement};
pub use output::{FieldInfo, FieldListener, Output, OutputFn, Record, SharedOutput};
pub use state::FieldSeries;

pub(crate) use measurement::Inbound;
use state::{CloseSink, Ingest, SharedRoutes, lookup};

pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// One resolution: every field gets a series with this period and depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorSeries {
    pub name: String,
    pub period: Duration,
    pub max_count: usize,
}

impl CollectorSeries {
    #[must_use]
    pub fn new(name: impl Into<String>, period: Duration, max_count: usize) -> Self {
        Self {
            name: name.into(),
            period,
            max_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    pub sampling_interval: Duration,
    pub queue_capacity: usize,
    /// Prepended to published names as `prefix:measurement:field`.
    pub prefix: Option<String>,
    pub series: Vec<CollectorSeries>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            prefix: None,
            series: vec![CollectorSeries::new(
                "10m/10s",
                Duration::from_secs(10),
                60,
            )],
        }
    }
}

impl CollectorConfig {
    /// # Errors
    ///
    /// Returns an error for a zero sampling interval or queue capacity, an
    /// empty series list, a series with zero period or max count, or a
    /// duplicated series name.
    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.sampling_interval.is_zero() {
            return Err(CollectorError::SamplingIntervalZero);
        }
        if self.queue_capacity == 0 {
            return Err(CollectorError::QueueCapacityZero);
        }
        if self.series.is_empty() {
            return Err(CollectorError::NoSeries);
        }
        for (index, series) in self.series.iter().enumerate() {
            if series.period.is_zero() || series.max_count == 0 {
                return Err(CollectorError::InvalidSeries {
                    name: series.name.clone(),
                });
            }
            if self
                .series
                .iter()
                .take(index)
                .any(|earlier| earlier.name == series.name)
            {
                return Err(CollectorError::DuplicateSeries {
                    name: series.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Cloneable handle for pushing measurements into a collector.
#[derive(Clone)]
pub struct MeasurementSender {
    tx: mpsc::Sender<Inbound>,
}

impl MeasurementSender {
    /// Queue a measurement. Waits while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Stopped`] once the collector has stopped.
    pub async fn send(&self, measurement: Measurement) -> Result<(), CollectorError> {
        self.tx
            .send(Inbound::Measurement(measurement))
            .await
            .map_err(|_closed| CollectorError::Stopped)
    }
}

struct NamedInput {
    name: String,
    input: SharedInput,
}

struct Running {
    stop_tx: oneshot::Sender<()>,
    owner: JoinHandle<()>,
    ingest: Arc<Ingest>,
}

pub struct Collector {
    config: CollectorConfig,
    clock: SharedClock,
    storage: Option<SharedStorage>,
    registry: SharedRegistry,
    listener: Option<FieldListener>,
    inputs: Vec<NamedInput>,
    outputs: Vec<SharedOutput>,
    routes: SharedRoutes,
    tx: mpsc::Sender<Inbound>,
    rx: Option<mpsc::Receiver<Inbound>>,
    running: Option<Running>,
}

impl Collector {
    /// # Errors
    ///
    /// Returns an error when `config` does not validate.
    pub fn new(config: CollectorConfig) -> Result<Self, CollectorError> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        Ok(Self {
            config,
            clock: system_clock(),
            storage: None,
            registry: Arc::new(MemoryRegistry::new()),
            listener: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            routes: SharedRoutes::default(),
            tx,
            rx: Some(rx),
            running: None,
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_storage(mut self, storage: SharedStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_listener(mut self, listener: FieldListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Initialize `input` and gather once to learn its measurement name.
    /// The registration sample is not recorded.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Registration`] when init or the first
    /// gather fails or yields no name, and
    /// [`CollectorError::AlreadyStarted`] after [`Collector::start`].
    pub async fn add_input(&mut self, input: SharedInput) -> Result<String, CollectorError> {
        if self.running.is_some() {
            return Err(CollectorError::AlreadyStarted);
        }
        input
            .init()
            .await
            .map_err(|source| CollectorError::Registration { source })?;
        let sample = input
            .gather()
            .await
            .map_err(|source| CollectorError::Registration { source })?;
        if sample.name.is_empty() {
            return Err(CollectorError::Registration {
                source: InputError::MissingName {
                    input: format!("#{}", self.inputs.len()),
                },
            });
        }
        debug!("Registered input {}", sample.name);
        self.inputs.push(NamedInput {
            name: sample.name.clone(),
            input,
        });
        Ok(sample.name)
    }

    /// # Errors
    ///
    /// Returns [`CollectorError::OutputInit`] when the output fails to
    /// initialize, and [`CollectorError::AlreadyStarted`] after
    /// [`Collector::start`].
    pub async fn add_output(&mut self, output: SharedOutput) -> Result<(), CollectorError> {
        if self.running.is_some() {
            return Err(CollectorError::AlreadyStarted);
        }
        output
            .init()
            .await
            .map_err(|source| CollectorError::OutputInit { source })?;
        self.outputs.push(output);
        Ok(())
    }

    /// Spawn the owner task and start the sampling ticker.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::AlreadyStarted`] when called twice.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        let Some(rx) = self.rx.take() else {
            return Err(CollectorError::AlreadyStarted);
        };
        let ingest = Arc::new(self.ingest());
        let inputs: Arc<[NamedInput]> = self
            .inputs
            .iter()
            .map(|named| NamedInput {
                name: named.name.clone(),
                input: Arc::clone(&named.input),
            })
            .collect();
        let (stop_tx, stop_rx) = oneshot::channel();
        let owner = tokio::spawn(run_owner(
            rx,
            stop_rx,
            Arc::clone(&ingest),
            inputs,
            self.tx.clone(),
            Arc::clone(&self.clock),
            self.config.sampling_interval,
        ));
        self.running = Some(Running {
            stop_tx,
            owner,
            ingest,
        });
        Ok(())
    }

    fn ingest(&self) -> Ingest {
        Ingest {
            series: self.config.series.clone().into(),
            prefix: self.config.prefix.clone(),
            clock: Arc::clone(&self.clock),
            storage: self.storage.clone(),
            registry: Arc::clone(&self.registry),
            sink: Arc::new(CloseSink {
                listener: self.listener.clone(),
                outputs: self.outputs.clone(),
            }),
            routes: Arc::clone(&self.routes),
        }
    }

    /// Stop sampling, ingest everything still queued, persist all series
    /// and release inputs and outputs. Later sends fail with
    /// [`CollectorError::Stopped`].
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Join`] when the owner task panicked.
    pub async fn stop(mut self) -> Result<(), CollectorError> {
        let ingest = match self.running.take() {
            Some(running) => {
                drop(running.stop_tx.send(()));
                running
                    .owner
                    .await
                    .map_err(|source| CollectorError::Join { source })?;
                running.ingest
            }
            None => {
                let ingest = Arc::new(self.ingest());
                if let Some(rx) = self.rx.take() {
                    drain(rx, &ingest).await;
                }
                ingest
            }
        };
        ingest.sync().await;

        for named in &self.inputs {
            if let Err(err) = named.input.deinit().await {
                warn!("Failed to release input {}: {}", named.name, err);
            }
        }
        for output in &self.outputs {
            if let Err(err) = output.deinit().await {
                warn!("Failed to release output: {}", err);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn sender(&self) -> MeasurementSender {
        MeasurementSender {
            tx: self.tx.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns [`CollectorError::Stopped`] once the collector has stopped.
    pub async fn send(&self, measurement: Measurement) -> Result<(), CollectorError> {
        self.sender().send(measurement).await
    }

    #[must_use]
    pub const fn sampling_interval(&self) -> Duration {
        self.config.sampling_interval
    }

    #[must_use]
    pub fn series(&self) -> &[CollectorSeries] {
        &self.config.series
    }

    /// Names of registered inputs, in registration order.
    #[must_use]
    pub fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|named| named.name.clone()).collect()
    }

    #[must_use]
    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// `measurement:field` of every routed field, sorted.
    #[must_use]
    pub fn metric_names(&self) -> Vec<String> {
        self.route_names(None)
    }

    /// Names the fields are published under, sorted.
    #[must_use]
    pub fn publish_names(&self) -> Vec<String> {
        self.route_names(self.config.prefix.as_deref())
    }

    fn route_names(&self, prefix: Option<&str>) -> Vec<String> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        routes
            .iter()
            .flat_map(|(measurement, fields)| {
                fields
                    .keys()
                    .map(move |field| public_name(prefix, measurement, field))
            })
            .collect()
    }

    #[must_use]
    pub fn timeseries(&self, measurement: &str, field: &str) -> Option<Arc<FieldSeries>> {
        lookup(&self.routes, measurement, field).map(|route| route.series)
    }

    /// The bucket currently being filled in each resolution, keyed by
    /// series name.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::MetricNotFound`] for a field that has
    /// never been ingested.
    pub fn inflight(
        &self,
        measurement: &str,
        field: &str,
    ) -> Result<BTreeMap<String, Record>, CollectorError> {
        let route =
            lookup(&self.routes, measurement, field).ok_or_else(|| CollectorError::MetricNotFound {
                measurement: measurement.to_owned(),
                field: field.to_owned(),
            })?;
        let mut inflight = BTreeMap::new();
        for (resolution, series) in self.config.series.iter().zip(route.series.series()) {
            let info = FieldInfo::new(measurement, field, resolution, &route.field_type);
            let record = match series.last() {
                Some(point) => Record::new(&point, &info),
                None => Record {
                    measure: info.measure,
                    name: info.name,
                    time: self.clock.now(),
                    value: None,
                    is_null: true,
                    series: info.series,
                    period: info.period,
                    type_label: info.type_label,
                    unit: info.unit,
                },
            };
            inflight.insert(resolution.name.clone(), record);
        }
        Ok(inflight)
    }
}

async fn run_owner(
    mut rx: mpsc::Receiver<Inbound>,
    mut stop_rx: oneshot::Receiver<()>,
    ingest: Arc<Ingest>,
    inputs: Arc<[NamedInput]>,
    tx: mpsc::Sender<Inbound>,
    clock: SharedClock,
    sampling_interval: Duration,
) {
    let first_tick = Instant::now()
        .checked_add(sampling_interval)
        .unwrap_or_else(Instant::now);
    let mut ticker = tokio::time::interval_at(first_tick, sampling_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            maybe_msg = rx.recv() => {
                match maybe_msg {
                    Some(msg) => ingest.receive(msg).await,
                    None => break,
                }
            },
            _ = ticker.tick() => {
                drop(tokio::spawn(gather_inputs(
                    Arc::clone(&inputs),
                    tx.clone(),
                    Arc::clone(&clock),
                )));
            },
        }
    }

    drain(rx, &ingest).await;
}

/// Refuse further sends and ingest whatever is already queued.
async fn drain(mut rx: mpsc::Receiver<Inbound>, ingest: &Ingest) {
    rx.close();
    let mut drained = 0usize;
    while let Some(msg) = rx.recv().await {
        ingest.receive(msg).await;
        drained = drained.saturating_add(1);
    }
    debug!("Drained {} queued messages", drained);
}

async fn gather_inputs(inputs: Arc<[NamedInput]>, tx: mpsc::Sender<Inbound>, clock: SharedClock) {
    let time = clock.now();
    for named in inputs.iter() {
        let mut measurement = match named.input.gather().await {
            Ok(measurement) => measurement,
            Err(err) => {
                warn!("Error measuring {}: {}", named.name, err);
                continue;
            }
        };
        if measurement.name.is_empty() {
            measurement.name.clone_from(&named.name);
        }
        measurement.time = Some(time);
        if tx.send(Inbound::Measurement(measurement)).await.is_err() {
            debug!("Collector stopped; dropping tick at {}", time);
            return;
        }
    }
    if tx.send(Inbound::Sync(time)).await.is_err() {
        debug!("Collector stopped; dropping sync marker at {}", time);
    }
}
