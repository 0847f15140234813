//! Sluice: answers chat and HTTP messages with sandboxed plugins.
//!
//! # Usage
//!
//! ```bash
//! sluice                      # sluice.yml or sluice.yaml, searched
//! sluice -f deploy/bot.yaml   # explicit file
//! DEBUG=1 sluice              # debug logging
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use sluice_runtime::config::{ConfigLoader, validate_config};
use sluice_runtime::logging::{self, LoggingBuilder};
use sluice_runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(about = "Chat gateway answering messages with sandboxed plugins")]
#[command(version)]
struct Cli {
    /// Use a different file for the config. By default: sluice.y{,a}ml in
    /// the current directory, then in the user config directory
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Configuration profile (overrides SLUICE_PROFILE)
    #[arg(long)]
    profile: Option<String>,
}

/// Whether `DEBUG` is set to anything non-empty. Read once, at startup.
fn debug_requested() -> bool {
    std::env::var_os("DEBUG").is_some_and(|v| !v.is_empty())
}

async fn run(cli: Cli) -> Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(file) = &cli.file {
        loader = loader.file(file);
    }
    if let Some(profile) = &cli.profile {
        loader = loader.profile(profile);
    }

    let mut config = loader.load()?;
    config.logging.apply_debug_toggle(debug_requested());
    logging::init_from_config(&config.logging);

    validate_config(&config)?;

    let runtime = Runtime::from_config(&config)
        .await
        .context("startup failed")?;
    runtime.run().await?;

    info!("Bye");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // No-op if the configured subscriber is already installed.
            LoggingBuilder::new().init();
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
