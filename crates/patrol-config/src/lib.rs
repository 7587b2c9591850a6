//! Configuration system for the Patrol field-workforce client.
//!
//! Provides TOML-based configuration with:
//! - A `[server]` section (API base URL, request timeout, user agent)
//! - A `[storage]` section (where durable credentials live)
//! - Config file layering (XDG user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, Layer, LoadedConfig, load_config, load_config_file, load_config_with_options, save_config,
    xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
