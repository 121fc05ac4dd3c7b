use async_trait::async_trait;

use crate::error::InputError;
use crate::metrics::collector::{Input, Measurement};
use crate::metrics::producer::{FieldType, Unit};

const MEASUREMENT: &str = "process";

/// Resident set size of the current process, in bytes, as gauge `rss`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessInput;

impl ProcessInput {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Input for ProcessInput {
    async fn gather(&self) -> Result<Measurement, InputError> {
        let rss = read_rss_bytes().await?;
        Ok(Measurement::new(MEASUREMENT).with_field(
            "rss",
            rss as f64,
            FieldType::gauge(Unit::Bytes),
        ))
    }
}

#[cfg(target_os = "linux")]
async fn read_rss_bytes() -> Result<u64, InputError> {
    let statm = tokio::fs::read_to_string("/proc/self/statm")
        .await
        .map_err(|err| InputError::External {
            context: "Failed to read /proc/self/statm",
            source: Box::new(err),
        })?;
    let resident = statm
        .split_whitespace()
        .nth(1)
        .and_then(|value| value.parse::<u64>().ok())
        .ok_or_else(|| InputError::gather(MEASUREMENT, "malformed /proc/self/statm"))?;
    // SAFETY: sysconf has no preconditions; only the page size is read.
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    let page_size = u64::try_from(page_size)
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| InputError::gather(MEASUREMENT, "invalid page size"))?;
    Ok(resident.saturating_mul(page_size))
}

#[cfg(not(target_os = "linux"))]
async fn read_rss_bytes() -> Result<u64, InputError> {
    Err(InputError::gather(
        MEASUREMENT,
        "resident set size is only available on Linux",
    ))
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};

    #[tokio::test(flavor = "current_thread")]
    async fn gathers_resident_set_size() -> AppResult<()> {
        let measurement = ProcessInput::new().gather().await?;
        let field = measurement
            .fields
            .first()
            .ok_or_else(|| AppError::validation("missing rss field"))?;
        if measurement.name != "process" || field.name != "rss" {
            return Err(AppError::validation(format!(
                "unexpected measurement {} field {}",
                measurement.name, field.name
            )));
        }
        if field.value <= 0.0 {
            return Err(AppError::validation(format!("rss should be positive: {}", field.value)));
        }
        if field.field_type.unit() != Unit::Bytes {
            return Err(AppError::validation("rss should be reported in bytes"));
        }
        Ok(())
    }
}
