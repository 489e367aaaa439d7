//! Process startup: configuration, logging and the shell.

use std::{
    io::IsTerminal,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::ArgMatches;
use pickup_core::{load_config, Config, StoreBackend};
use tracing_subscriber::EnvFilter;

use crate::{app::App, shell};

/// Load config, start logging, open the store and run the shell on stdin.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the store cannot be opened
/// or stdin/stdout fail.
pub async fn start(matches: &ArgMatches) -> Result<()> {
    let config = resolve_config(matches).await?;
    init_tracing(&config.log_level)?;
    tracing::info!(
        backend = %config.backend,
        lanes = config.lanes.len(),
        "starting pickup shell"
    );

    let mut app = App::open(&config)
        .await
        .context("Failed to open the document store")?;

    let interactive = std::io::stdin().is_terminal();
    if interactive {
        println!("Pickup shell. Type 'help' for commands.");
    }
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    shell::run(&mut app, input, &mut stdout, interactive).await
}

/// Configuration from files and environment with command-line flags on top.
///
/// # Errors
///
/// Returns an error if any layer is invalid.
pub async fn resolve_config(matches: &ArgMatches) -> pickup_core::Result<Config> {
    let explicit = matches.get_one::<PathBuf>("config").map(PathBuf::as_path);
    let mut config = load_config(explicit).await?;
    apply_flags(
        &mut config,
        matches.get_one::<PathBuf>("database").map(PathBuf::as_path),
        matches.get_flag("memory"),
    );
    config.validate()?;
    Ok(config)
}

fn apply_flags(config: &mut Config, database: Option<&Path>, memory: bool) {
    if let Some(path) = database {
        config.backend = StoreBackend::Sqlite;
        config.database = path.to_path_buf();
    }
    if memory {
        config.backend = StoreBackend::Memory;
    }
}

/// Initialize tracing subscriber for logging
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr so it
/// never mixes with shell output.
///
/// # Errors
/// Returns an error if the level is not a valid filter or the subscriber
/// initialization fails
pub fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level '{level}'"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))
}
