use std::time::Duration;

use clap::Parser;

use super::*;
use crate::error::{AppError, AppResult, ValidationError};

#[test]
fn parse_duration_value_accepts_units() -> AppResult<()> {
    let cases = [
        ("500ms", Duration::from_millis(500)),
        ("10", Duration::from_secs(10)),
        ("10s", Duration::from_secs(10)),
        ("2m", Duration::from_secs(120)),
        (" 1h ", Duration::from_secs(3600)),
    ];
    for (input, expected) in cases {
        let parsed = parse_duration_value(input)?;
        if parsed != expected {
            return Err(AppError::validation(format!(
                "{} parsed as {:?}, expected {:?}",
                input, parsed, expected
            )));
        }
    }
    Ok(())
}

#[test]
fn parse_duration_value_rejects_bad_input() -> AppResult<()> {
    let cases = ["", "ms", "0s", "5d", "99999999999999999999h"];
    for input in cases {
        if let Ok(parsed) = parse_duration_value(input) {
            return Err(AppError::validation(format!(
                "{:?} should be rejected, got {:?}",
                input, parsed
            )));
        }
    }
    match parse_duration_value("3w") {
        Err(ValidationError::InvalidDurationUnit { unit }) if unit == "w" => Ok(()),
        other => Err(AppError::validation(format!(
            "expected unit error, got {:?}",
            other
        ))),
    }
}

#[test]
fn defaults_match_collector_defaults() -> AppResult<()> {
    let args = RollupArgs::try_parse_from(["metric-rollup"])?;
    if args.sampling_interval != Duration::from_secs(10) || args.queue_capacity != 100 {
        return Err(AppError::validation(format!(
            "unexpected defaults {:?}",
            args
        )));
    }
    if args.config.is_some() || args.duration.is_some() || args.snapshot || args.verbose {
        return Err(AppError::validation("optional flags should be unset"));
    }
    Ok(())
}

#[test]
fn flags_override_defaults() -> AppResult<()> {
    let args = RollupArgs::try_parse_from([
        "metric-rollup",
        "--config",
        "rollup.toml",
        "-i",
        "250ms",
        "--duration",
        "1m",
        "--prefix",
        "edge",
        "--snapshot",
    ])?;
    if args.config.as_deref() != Some("rollup.toml")
        || args.sampling_interval != Duration::from_millis(250)
        || args.duration != Some(Duration::from_secs(60))
        || args.prefix.as_deref() != Some("edge")
        || !args.snapshot
    {
        return Err(AppError::validation(format!("unexpected args {:?}", args)));
    }
    Ok(())
}

#[test]
fn zero_queue_capacity_is_rejected() -> AppResult<()> {
    if RollupArgs::try_parse_from(["metric-rollup", "--queue-capacity", "0"]).is_ok() {
        return Err(AppError::validation("queue capacity 0 should be rejected"));
    }
    Ok(())
}
