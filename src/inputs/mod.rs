//! Built-in inputs sampled by the binary.
mod load;
mod process;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::metrics::collector::SharedInput;

pub use load::LoadAverageInput;
pub use process::ProcessInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Load,
    Process,
}

impl InputKind {
    #[must_use]
    pub fn build(self) -> SharedInput {
        match self {
            InputKind::Load => Arc::new(LoadAverageInput::new()),
            InputKind::Process => Arc::new(ProcessInput::new()),
        }
    }
}
