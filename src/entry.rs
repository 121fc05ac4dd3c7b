use std::time::Duration;

use clap::{ArgMatches, CommandFactory, FromArgMatches};
use serde_json::{Map, Value};
use tracing::{info, warn};

use metric_rollup::args::RollupArgs;
use metric_rollup::config::{Settings, apply_config, load_config};
use metric_rollup::error::AppResult;
use metric_rollup::metrics::Collector;
use metric_rollup::metrics::registry::SharedRegistry;

use crate::shutdown::ShutdownReceiver;
use crate::shutdown_handlers::{setup_signal_shutdown_handler, shutdown_channel};

pub(crate) fn run() -> AppResult<()> {
    let matches = RollupArgs::command().get_matches();
    let args = RollupArgs::from_arg_matches(&matches)?;

    crate::logger::init_logging(args.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args, &matches))
}

async fn run_async(args: RollupArgs, matches: &ArgMatches) -> AppResult<()> {
    let config = load_config(args.config.as_deref())?;
    let settings = apply_config(&args, matches, config.as_ref())?;
    let mut collector = build_collector(settings).await?;

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    collector.start()?;
    info!(
        "Sampling {:?} every {:?}",
        collector.input_names(),
        collector.sampling_interval()
    );

    wait_for_stop(shutdown_rx, args.duration).await;
    drop(shutdown_tx.send(()));

    let registry = collector.registry();
    collector.stop().await?;
    signal_handle.await?;

    if args.snapshot {
        println!("{}", snapshot(&registry));
    }
    Ok(())
}

async fn build_collector(settings: Settings) -> AppResult<Collector> {
    let Settings {
        collector: config,
        storage,
        inputs,
        outputs,
    } = settings;

    let mut collector = Collector::new(config)?;
    if let Some(selection) = storage {
        collector = collector.with_storage(selection.open().await?);
    }
    for (kind, path) in outputs {
        collector.add_output(kind.build(path)?).await?;
    }
    for kind in inputs {
        // A missing platform source should not prevent the others.
        if let Err(err) = collector.add_input(kind.build()).await {
            warn!("Skipping input {:?}: {}", kind, err);
        }
    }
    Ok(collector)
}

async fn wait_for_stop(mut shutdown_rx: ShutdownReceiver, duration: Option<Duration>) {
    tokio::select! {
        _ = shutdown_rx.recv() => {
            info!("Shutdown requested");
        }
        () = sleep_or_pending(duration) => {
            info!("Run duration elapsed");
        }
    }
}

async fn sleep_or_pending(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}

/// Every published series keyed by name. Renderings that fail to parse are
/// kept as strings.
fn snapshot(registry: &SharedRegistry) -> Value {
    let mut object = Map::new();
    for name in registry.names() {
        let Some(rendered) = registry.render(&name) else {
            continue;
        };
        let value = serde_json::from_str(&rendered).unwrap_or(Value::String(rendered));
        object.insert(name, value);
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use metric_rollup::metrics::registry::{MemoryRegistry, Registry};
    use metric_rollup::metrics::timeseries::TimeSeries;

    use super::*;

    #[test]
    fn snapshot_keys_renderings_by_name() -> Result<(), String> {
        let registry = Arc::new(MemoryRegistry::new());
        let series: Arc<TimeSeries<f64>> =
            Arc::new(TimeSeries::new(Duration::from_secs(60), 5, None));
        let time = Utc
            .with_ymd_and_hms(2024, 6, 1, 10, 0, 30)
            .single()
            .ok_or("invalid timestamp")?;
        series.add_time(time, 0.5);
        registry.publish("load:load1", series);

        let shared: SharedRegistry = registry;
        let value = snapshot(&shared);
        let expected = serde_json::json!({
            "load:load1": [{"ts": "2024-06-01T10:01:00Z", "value": 0.5}]
        });
        if value != expected {
            return Err(format!("unexpected snapshot {}", value));
        }
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn duration_bounds_the_wait() -> Result<(), String> {
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();
        tokio::time::timeout(
            Duration::from_secs(1),
            wait_for_stop(shutdown_rx, Some(Duration::from_millis(10))),
        )
        .await
        .map_err(|err| format!("wait did not finish: {}", err))
    }
}
