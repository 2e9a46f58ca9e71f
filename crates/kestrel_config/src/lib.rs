//! Parsing and validation of `kestrel.toml` simulation settings.
//!
//! The `[simulation]` table controls stimulus (generated or replayed
//! vectors), what gets recorded, golden-file verification, memory
//! initialization and the number of evaluation workers. Command-line flags
//! are layered on top of these values by the CLI.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, validate_config, CONFIG_FILE_NAME};
pub use types::*;
