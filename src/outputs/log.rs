use tracing::info;

use crate::metrics::collector::{Output, Record};

/// Logs every closed bucket at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOutput;

impl LogOutput {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Output for LogOutput {
    fn process(&self, record: &Record) {
        let value = record
            .value
            .as_ref()
            .map_or_else(|| "no data".to_owned(), |product| product.summary().to_string());
        info!(
            "{}:{} [{}] {} {}",
            record.measure,
            record.name,
            record.series,
            record.time.to_rfc3339(),
            value
        );
    }
}
