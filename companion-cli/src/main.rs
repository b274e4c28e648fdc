//! # companion-cli
//!
//! CLI for inspecting and exercising the CGM companion-device sync engine.
//!
//! ## Commands
//!
//! - `status`: Show the effective configuration and persisted devices
//! - `forget`: Clear the persisted device list
//! - `demo`: Run the engine against a mock provider and canned readings
//!
//! ## Example
//!
//! ```bash
//! # Inspect what the engine would load at start-up
//! companion-cli --config companion.toml status
//!
//! # Watch a full discovery / getData / send-twice cycle
//! RUST_LOG=debug companion-cli demo
//!
//! # Start over
//! companion-cli forget
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use companion_engine::EngineConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{demo, forget, status};

/// CLI for the CGM companion-device sync engine.
#[derive(Parser, Debug)]
#[command(name = "companion-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the persisted device list (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show effective configuration, app catalog and persisted devices
    Status,

    /// Clear the persisted device list
    Forget,

    /// Run the engine against a mock provider and canned readings
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = load_config(cli.config.as_deref(), cli.data_dir)?;

    match cli.command {
        Commands::Status => status::run(&config)?,
        Commands::Forget => forget::run(&config)?,
        Commands::Demo => demo::run(config).await?,
    }

    Ok(())
}

/// Load the configuration file (or defaults) and apply command-line overrides.
fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_file(path).context("Failed to load configuration")?,
        None => EngineConfig::default(),
    };

    if data_dir.is_some() {
        config.storage.data_dir = data_dir;
    }

    Ok(config)
}
