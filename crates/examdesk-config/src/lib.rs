//! Configuration system for the examdesk client.
//!
//! Provides TOML-based configuration with:
//! - Backend connection settings (`[server]`)
//! - Settings-cache TTL (`[cache]`)
//! - Location of persisted client state (`[storage]`)
//! - Fallback site branding shown before the first fetch (`[site]`)
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, config_dir, config_path, default_data_dir, load_config, load_config_file,
    load_config_with_options, save_config,
};
pub use error::{ConfigError, Result};
pub use types::*;
