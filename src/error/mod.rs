mod app;
mod collector;
mod config;
mod input;
mod output;
mod storage;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use collector::CollectorError;
pub use config::ConfigError;
pub use input::InputError;
pub use output::OutputError;
pub use storage::StorageError;
pub use validation::ValidationError;
