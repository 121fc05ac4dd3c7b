//! Built-in outputs for closed buckets.
mod jsonl;
mod log;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::metrics::collector::SharedOutput;

pub use jsonl::JsonLinesOutput;
pub use log::LogOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Log,
    Jsonl,
}

impl OutputKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OutputKind::Log => "log",
            OutputKind::Jsonl => "jsonl",
        }
    }

    /// # Errors
    ///
    /// Returns an error when a file-backed output has no path.
    pub fn build(self, path: Option<PathBuf>) -> Result<SharedOutput, ConfigError> {
        match self {
            OutputKind::Log => Ok(Arc::new(LogOutput::new())),
            OutputKind::Jsonl => {
                let path = path.ok_or(ConfigError::OutputPathRequired {
                    kind: self.as_str(),
                })?;
                Ok(Arc::new(JsonLinesOutput::new(path)))
            }
        }
    }
}
