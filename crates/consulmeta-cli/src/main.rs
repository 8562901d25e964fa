//! consulmeta command-line entry point
//!
//! Wires the adapter registry the way a bridge process does at startup and
//! exposes the adapter operations as subcommands.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use consulmeta_core::AdapterRegistry;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "consulmeta", version, about = "Publish services and their metadata to Consul")]
struct Cli {
    /// Adapter URI: consulmeta://[host[:port]][/key/prefix]
    #[arg(long, env = "CONSULMETA_URI", default_value = "consulmeta://")]
    uri: Url,

    /// Emit logs as JSON
    #[arg(long, env = "CONSULMETA_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the store is reachable
    Ping,
    /// List services registered with the local agent
    Services,
    /// Register a service described by a JSON file
    Register {
        #[arg(long)]
        file: PathBuf,
    },
    /// Deregister a service instance
    Deregister {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
    /// Show the metadata stored for a service name
    Metadata {
        #[arg(long)]
        name: String,
    },
}

/// Initialize tracing. Uses RUST_LOG for filtering (defaults to info) and
/// writes to stderr so command output stays on stdout.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_ansi(true).with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut registry = AdapterRegistry::new();
    consulmeta_service::register_adapters(&mut registry);

    // Construction failure ends the process
    let adapter = registry
        .create(&cli.uri)
        .with_context(|| format!("Failed to create adapter for {}", cli.uri))?;

    match cli.command {
        Command::Ping => commands::ping(adapter.as_ref()).await,
        Command::Services => commands::services(adapter.as_ref()).await,
        Command::Register { file } => commands::register(adapter.as_ref(), &file).await,
        Command::Deregister { id, name } => commands::deregister(adapter.as_ref(), id, name).await,
        Command::Metadata { name } => commands::metadata(&cli.uri, &name).await,
    }
}
