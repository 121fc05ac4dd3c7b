use std::path::PathBuf;
use std::sync::Arc;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{RollupArgs, parsers::ensure_positive};
use crate::error::{AppError, AppResult, ConfigError, StorageError};
use crate::inputs::InputKind;
use crate::metrics::collector::{CollectorConfig, CollectorSeries};
use crate::outputs::OutputKind;
use crate::storage::{FileStorage, MemoryStorage, SharedStorage, SqliteStorage};

use super::types::{ConfigFile, OutputConfig, SeriesConfig, StorageConfig, StorageKind};

/// Inputs sampled when the config does not list any.
const DEFAULT_INPUTS: [InputKind; 2] = [InputKind::Load, InputKind::Process];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSelection {
    Memory,
    File(PathBuf),
    Sqlite(PathBuf),
}

impl StorageSelection {
    /// # Errors
    ///
    /// Returns an error when the SQLite database cannot be opened.
    pub async fn open(&self) -> Result<SharedStorage, StorageError> {
        match self {
            StorageSelection::Memory => Ok(Arc::new(MemoryStorage::new())),
            StorageSelection::File(root) => Ok(Arc::new(FileStorage::new(root.clone()))),
            StorageSelection::Sqlite(path) => Ok(Arc::new(SqliteStorage::open(path).await?)),
        }
    }
}

/// Everything the binary needs to assemble a collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub collector: CollectorConfig,
    pub storage: Option<StorageSelection>,
    pub inputs: Vec<InputKind>,
    pub outputs: Vec<(OutputKind, Option<PathBuf>)>,
}

/// Merges CLI arguments over config file values. Flags given on the
/// command line win; otherwise the file wins over flag defaults.
///
/// # Errors
///
/// Returns an error when config values are invalid.
pub fn apply_config(
    args: &RollupArgs,
    matches: &ArgMatches,
    config: Option<&ConfigFile>,
) -> AppResult<Settings> {
    let mut collector = CollectorConfig {
        sampling_interval: args.sampling_interval,
        queue_capacity: args.queue_capacity,
        prefix: args.prefix.clone(),
        ..CollectorConfig::default()
    };
    let Some(config) = config else {
        return Ok(Settings {
            collector,
            storage: None,
            inputs: DEFAULT_INPUTS.to_vec(),
            outputs: vec![(OutputKind::Log, None)],
        });
    };

    if !is_cli(matches, "sampling_interval")
        && let Some(interval) = config.sampling_interval.as_ref()
    {
        collector.sampling_interval = interval.to_duration().map_err(|err| {
            AppError::config(ConfigError::InvalidDuration {
                field: "sampling_interval".to_owned(),
                source: err,
            })
        })?;
    }

    if !is_cli(matches, "queue_capacity")
        && let Some(capacity) = config.queue_capacity
    {
        collector.queue_capacity = ensure_positive_field(capacity, "queue_capacity")?;
    }

    if args.prefix.is_none() {
        collector.prefix.clone_from(&config.prefix);
    }

    if let Some(series) = config.series.as_deref() {
        collector.series = series_from_config(series)?;
    }
    collector.validate()?;

    Ok(Settings {
        collector,
        storage: config.storage.as_ref().map(storage_from_config).transpose()?,
        inputs: config.inputs.as_ref().map_or_else(
            || DEFAULT_INPUTS.to_vec(),
            |inputs| inputs.iter().map(|input| input.kind).collect(),
        ),
        outputs: match config.outputs.as_deref() {
            Some(outputs) => outputs_from_config(outputs)?,
            None => vec![(OutputKind::Log, None)],
        },
    })
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_field(value: usize, field: &str) -> AppResult<usize> {
    ensure_positive(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn series_from_config(entries: &[SeriesConfig]) -> AppResult<Vec<CollectorSeries>> {
    let mut series = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if entry.name.trim().is_empty() {
            return Err(AppError::config(ConfigError::SeriesNameEmpty { index }));
        }
        let period = entry.period.to_duration().map_err(|err| {
            AppError::config(ConfigError::InvalidDuration {
                field: format!("series.{}.period", entry.name),
                source: err,
            })
        })?;
        let max_count =
            ensure_positive_field(entry.max_count, &format!("series.{}.max_count", entry.name))?;
        series.push(CollectorSeries::new(entry.name.clone(), period, max_count));
    }
    Ok(series)
}

fn storage_from_config(storage: &StorageConfig) -> AppResult<StorageSelection> {
    let path = || {
        storage.path.as_ref().map(PathBuf::from).ok_or_else(|| {
            AppError::config(ConfigError::StoragePathRequired {
                kind: storage.kind.as_str(),
            })
        })
    };
    match storage.kind {
        StorageKind::Memory => Ok(StorageSelection::Memory),
        StorageKind::File => Ok(StorageSelection::File(path()?)),
        StorageKind::Sqlite => Ok(StorageSelection::Sqlite(path()?)),
    }
}

fn outputs_from_config(outputs: &[OutputConfig]) -> AppResult<Vec<(OutputKind, Option<PathBuf>)>> {
    outputs
        .iter()
        .map(|output| {
            let path = output.path.as_ref().map(PathBuf::from);
            if output.kind == OutputKind::Jsonl && path.is_none() {
                return Err(AppError::config(ConfigError::OutputPathRequired {
                    kind: output.kind.as_str(),
                }));
            }
            Ok((output.kind, path))
        })
        .collect()
}
