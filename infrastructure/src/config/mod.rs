//! Configuration file loading for cadence
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `CADENCE_` prefixed environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./cadence.toml` or `./.cadence.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/cadence/config.toml`
//! 5. Default values

mod error;
mod file_config;
mod loader;

pub use error::ConfigError;
pub use file_config::{
    FileChainsConfig, FileConfig, FileCrossProvider, FileLoggingConfig, FileProviderConfig,
    FileRoleChain, FileRunConfig,
};
pub use loader::ConfigLoader;
