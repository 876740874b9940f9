//! Tickr CLI - Main entry point

mod cli;

use clap::{Parser, Subcommand};
use cli::{PluginCli, PluginCommand};
use std::path::PathBuf;
use std::sync::Arc;
use tickr_foundation::ConfigStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tickr - always-on-top desk clock
#[derive(Parser, Debug)]
#[command(name = "tickr")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Use this config file instead of the global one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage plugins
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = match &args.config {
        Some(path) => ConfigStore::load(path)?,
        None => ConfigStore::load_global()?,
    };
    tracing::debug!("Using config {:?}", config.path());

    match args.command {
        Command::Plugin { command } => PluginCli::new(Arc::new(config))?.run(command).await,
    }
}
