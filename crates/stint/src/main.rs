//! stint - session expiration and serialization toolkit
//!
//! Main entry point for the stint CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{check, config, decode, encode};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// stint - session expiration and serialization toolkit
#[derive(Parser)]
#[command(name = "stint")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Use this config file instead of discovering one
    #[arg(long, global = true, env = "STINT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate the expiration policy for a session
    Check(check::CheckArgs),

    /// Encode a session with a configured codec
    Encode(encode::EncodeArgs),

    /// Decode a session encoded by `stint encode`
    Decode(decode::DecodeArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "stint=debug,stint_session=debug,stint_codec=debug,stint_expiry=debug,stint_region=debug,stint_config=debug,info"
    } else {
        "stint=info,warn"
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let ctx = commands::Context {
        config_path: cli.config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Check(args) => check::run(args, &ctx),
        Commands::Encode(args) => encode::run(args, &ctx),
        Commands::Decode(args) => decode::run(args, &ctx),
        Commands::Config(args) => config::run(args, &ctx),
    }
}
