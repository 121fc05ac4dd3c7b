
use std::fs;

#[cfg(target_os = "linux")]
use serde_json::Value;
use tempfile::tempdir;

use support_cli::run_rollup;

#[cfg(target_os = "linux")]
fn stdout_json(output: &std::process::Output) -> Result<Value, String> {
    if !output.status.success() {
        return Err(format!(
            "stdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ));
    }
    serde_json::from_slice(&output.stdout).map_err(|err| {
        format!(
            "snapshot is not JSON ({}): {}",
            err,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[cfg(target_os = "linux")]
#[test]
fn e2e_cli_samples_persists_and_snapshots() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let config = r#"
sampling_interval = "100ms"
prefix = "e2e"

[[series]]
name = "10s/1s"
period = "1s"
max_count = 10

[storage]
kind = "file"
path = "series"

[[inputs]]
kind = "process"

[[outputs]]
kind = "jsonl"
path = "closed.jsonl"
"#;
    fs::write(dir.path().join("rollup.toml"), config)
        .map_err(|err| format!("write config failed: {}", err))?;

    let output = run_rollup(dir.path(), ["--duration", "1500ms", "--snapshot"])?;
    let snapshot = stdout_json(&output)?;
    let rss = snapshot
        .get("e2e:process:rss")
        .and_then(Value::as_array)
        .ok_or_else(|| format!("missing e2e:process:rss in {}", snapshot))?;
    let resolution = rss
        .first()
        .and_then(Value::as_array)
        .ok_or_else(|| format!("missing per-second resolution in {}", snapshot))?;
    if resolution.is_empty() {
        return Err("per-second series is empty".to_owned());
    }

    let closed = fs::read_to_string(dir.path().join("closed.jsonl"))
        .map_err(|err| format!("read closed records failed: {}", err))?;
    let first = closed
        .lines()
        .next()
        .ok_or("no closed bucket was written")?;
    let record: Value =
        serde_json::from_str(first).map_err(|err| format!("bad record {}: {}", first, err))?;
    if record.get("measure") != Some(&Value::from("process"))
        || record.get("series") != Some(&Value::from("10s/1s"))
        || record.get("unit") != Some(&Value::from("bytes"))
    {
        return Err(format!("unexpected record {}", record));
    }

    let stored = dir
        .path()
        .join("series")
        .join("process")
        .join("rss")
        .join("10s%2F1s.json");
    if !stored.exists() {
        return Err(format!("expected stored series at {}", stored.display()));
    }
    Ok(())
}

#[test]
fn e2e_cli_rejects_invalid_config() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    fs::write(dir.path().join("rollup.toml"), "queue_capacity = 0\n")
        .map_err(|err| format!("write config failed: {}", err))?;

    let output = run_rollup(dir.path(), ["--duration", "10ms"])?;
    if output.status.success() {
        return Err("zero queue capacity should fail".to_owned());
    }
    Ok(())
}
