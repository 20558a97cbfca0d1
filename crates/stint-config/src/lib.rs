//! Configuration system for stint.
//!
//! Provides TOML-based configuration with:
//! - Expiration settings (`[expiration]`): idle timeout, fixed duration, action
//! - Ordered codec selection (`[serialization]`)
//! - Region sizing and native expiry (`[region]`)
//! - Config file layering (XDG user config + project-local overrides)
//!
//! [`StintConfig`] also assembles the configured components (policies,
//! codec chain, serializer registry, repository decorator) in one step.

mod assemble;
pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, save_config,
    xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
