//! AEL Node — entry point.
//!
//! Starts the channel node with configuration from a TOML file or defaults.

// Node accessors are part of the embedding surface and used by tests.
#![allow(dead_code)]

mod api;
mod config;
mod node;
mod state;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::{AelConfig, StorageBackend};
use node::AelNode;

/// AEL Node
#[derive(Parser, Debug)]
#[command(name = "ael-node", version, about = "AEL channel node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "ael.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the storage backend (memory, rocksdb).
    #[arg(long)]
    storage: Option<String>,

    /// Override the data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Override the log format (text, json).
    #[arg(long)]
    log_format: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        init_tracing(args.log_level.as_deref().unwrap_or("info"), "text");
        let config = AelConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    // Load configuration
    let mut config = AelConfig::read(&args.config)?;

    // Apply CLI overrides
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(ref storage) = args.storage {
        config.storage.backend = match storage.as_str() {
            "memory" => StorageBackend::Memory,
            "rocksdb" => StorageBackend::Rocksdb,
            other => anyhow::bail!("unknown storage backend {other:?}"),
        };
    }
    if let Some(ref data_dir) = args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }
    config.validate()?;

    init_tracing(&config.logging.level, &config.logging.format);
    tracing::info!("AEL Node v{}", env!("CARGO_PKG_VERSION"));

    // Create and start the node
    let mut node = AelNode::new(config)?;
    node.start().await?;

    // Set up graceful shutdown on SIGINT
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "API server task failed");
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    node.shutdown().await?;
    tracing::info!("AEL node exited cleanly");
    Ok(())
}
