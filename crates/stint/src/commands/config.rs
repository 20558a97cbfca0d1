//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::json;
use stint_config::{StintConfig, save_config, xdg_config_path};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Show the user configuration file path
    Path,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./stint.toml) instead of user config
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Path => cmd_path(ctx),
        ConfigCommand::Init { local, force } => cmd_init(ctx, local, force),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = &loaded.config;

    if ctx.json_output {
        let expiration = config.expiration();
        let region = config.region();
        let output = json!({
            "sources": loaded.loaded_from(),
            "expiration": {
                "idle_timeout_secs": expiration.idle_timeout_secs,
                "fixed_duration_secs": expiration.fixed_duration_secs,
                "action": expiration.action,
            },
            "serialization": config.serialization(),
            "region": region,
            "warnings": loaded.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("# stint configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    // Print every section, defaults included.
    let resolved = StintConfig {
        expiration: Some(config.expiration()),
        serialization: Some(config.serialization()),
        region: Some(config.region()),
    };
    println!("{}", resolved.to_toml()?);

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;

    if ctx.json_output {
        let sources: Vec<_> = loaded
            .sources
            .iter()
            .map(|s| json!({ "path": s.path, "loaded": s.loaded }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    let green = Style::new().green();
    let dim = Style::new().dim();

    println!("Config file search order (later overrides earlier):\n");
    for source in &loaded.sources {
        if source.loaded {
            println!("  {} {}", green.apply_to("✓ loaded"), source.path.display());
        } else {
            println!("  {} {}", dim.apply_to("· not found"), source.path.display());
        }
    }
    println!();

    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let Some(path) = ctx.config_path.clone().or_else(xdg_config_path) else {
        bail!("could not determine the user config directory");
    };

    if ctx.json_output {
        println!("{}", json!({ "path": path, "exists": path.is_file() }));
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

fn cmd_init(ctx: &Context, local: bool, force: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("stint.toml")
    } else if let Some(path) = ctx.config_path.clone().or_else(xdg_config_path) {
        path
    } else {
        bail!("could not determine the user config directory");
    };

    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let defaults = StintConfig {
        expiration: Some(Default::default()),
        serialization: Some(Default::default()),
        region: Some(Default::default()),
    };
    save_config(&defaults, &path)?;

    if ctx.json_output {
        println!("{}", json!({ "path": path, "created": true }));
    } else {
        println!("{} {}", style("Created").green(), path.display());
    }
    Ok(())
}
