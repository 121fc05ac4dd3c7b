use async_trait::async_trait;

use crate::error::InputError;
use crate::metrics::collector::{Input, Measurement};
use crate::metrics::producer::{FieldType, Unit};

const MEASUREMENT: &str = "load";

/// System load averages over 1, 5 and 15 minutes as gauges `load1`,
/// `load5` and `load15`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadAverageInput;

impl LoadAverageInput {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Input for LoadAverageInput {
    async fn gather(&self) -> Result<Measurement, InputError> {
        let [load1, load5, load15] = read_load_average()?;
        let gauge = FieldType::gauge(Unit::Short);
        Ok(Measurement::new(MEASUREMENT)
            .with_field("load1", load1, gauge.clone())
            .with_field("load5", load5, gauge.clone())
            .with_field("load15", load15, gauge))
    }
}

#[cfg(unix)]
fn read_load_average() -> Result<[f64; 3], InputError> {
    let mut loads = [0.0_f64; 3];
    // SAFETY: the pointer covers exactly three writable doubles and the
    // count passed matches.
    let filled = unsafe { libc::getloadavg(loads.as_mut_ptr(), 3) };
    if filled < 3 {
        return Err(InputError::gather(
            MEASUREMENT,
            format!("getloadavg returned {}", filled),
        ));
    }
    Ok(loads)
}

#[cfg(not(unix))]
fn read_load_average() -> Result<[f64; 3], InputError> {
    Err(InputError::gather(
        MEASUREMENT,
        "load averages are not available on this platform",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};

    #[tokio::test(flavor = "current_thread")]
    async fn gathers_three_non_negative_gauges() -> AppResult<()> {
        let measurement = LoadAverageInput::new().gather().await?;
        if measurement.name != "load" {
            return Err(AppError::validation(format!(
                "unexpected measurement {}",
                measurement.name
            )));
        }
        let names: Vec<&str> = measurement
            .fields
            .iter()
            .map(|field| field.name.as_str())
            .collect();
        if names != ["load1", "load5", "load15"] {
            return Err(AppError::validation(format!("unexpected fields {:?}", names)));
        }
        if let Some(field) = measurement.fields.iter().find(|field| field.value < 0.0) {
            return Err(AppError::validation(format!(
                "negative load average {} = {}",
                field.name, field.value
            )));
        }
        Ok(())
    }
}
