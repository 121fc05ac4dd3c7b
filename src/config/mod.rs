//! Configuration loading and application.
mod apply;
mod loader;
pub mod types;


pub use apply::{Settings, StorageSelection, apply_config};
pub use loader::{DEFAULT_CONFIG_FILES, load_config, load_config_file};
