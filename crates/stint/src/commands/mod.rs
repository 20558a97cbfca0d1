//! CLI command handlers.

pub mod check;
pub mod config;
pub mod decode;
pub mod encode;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::ValueEnum;
use stint_config::LoadedConfig;
use stint_config::discovery::ConfigSource;
use stint_session::Session;
use tracing::{debug, warn};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file, bypassing discovery.
    pub config_path: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Load the explicit config file, or discover and merge the usual layers.
    ///
    /// Layers skipped during discovery are reported as warnings.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let Some(path) = &self.config_path else {
            let loaded = stint_config::load_config(None)?;
            for warning in &loaded.warnings {
                warn!("{}", warning);
            }
            return Ok(loaded);
        };

        let config = stint_config::load_config_file(path)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded explicit config file");
        Ok(LoadedConfig {
            config,
            sources: vec![ConfigSource {
                path: path.clone(),
                loaded: true,
            }],
            warnings: Vec::new(),
        })
    }
}

/// Wire format for `encode` and `decode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Hex-encoded data serializer frame
    Data,
    /// Structured instance as JSON
    Structured,
}

/// Read a whole input file, or stdin for `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Read a session snapshot in JSON form.
pub fn read_session(path: &Path) -> Result<Session> {
    let text = read_input(path)?;
    serde_json::from_str(&text).with_context(|| format!("invalid session JSON in {}", path.display()))
}
