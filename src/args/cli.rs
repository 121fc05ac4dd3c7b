use std::time::Duration;

use clap::Parser;

use super::parsers::{parse_duration_arg, parse_positive_usize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Samples built-in inputs into multi-resolution rolling time series, persists them and pushes closed buckets to outputs."
)]
pub struct RollupArgs {
    /// Path to config file (TOML/JSON). Defaults to ./rollup.toml or ./rollup.json if present.
    #[arg(long, short = 'c')]
    pub config: Option<String>,

    /// How often inputs are gathered (supports ms/s/m/h)
    #[arg(
        long = "sampling-interval",
        short = 'i',
        default_value = "10s",
        value_parser = parse_duration_arg
    )]
    pub sampling_interval: Duration,

    /// Measurement queue capacity
    #[arg(long = "queue-capacity", default_value = "100", value_parser = parse_positive_usize)]
    pub queue_capacity: usize,

    /// Prefix for published series names
    #[arg(long)]
    pub prefix: Option<String>,

    /// Stop after this long instead of waiting for Ctrl-C (supports ms/s/m/h)
    #[arg(long, short = 'd', value_parser = parse_duration_arg)]
    pub duration: Option<Duration>,

    /// Print every published series as JSON after stopping
    #[arg(long)]
    pub snapshot: bool,

    /// Enable verbose logging (sets log level to debug unless overridden by ROLLUP_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
