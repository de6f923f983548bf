// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! # Sage Federation Gateway CLI
//!
//! The `sagefed` binary runs the federation gateway and talks to one.
//!
//! ## Commands
//!
//! - `sagefed serve` - Run the gateway in the foreground
//! - `sagefed status` - Probe a running gateway
//! - `sagefed node join|heartbeat|status|events` - Node-side federation calls
//! - `sagefed token inspect|verify|keygen` - Token and signing key utilities
//! - `sagefed config show|validate|generate` - Configuration management
//! - `sagefed db migrate` - Apply the federation mapping schema

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use sage_federation::commands::{self, ConfigCommand, DbCommand, NodeCommand, TokenCommand};
use sage_federation::daemon::{self, check_gateway_running, GatewayClient, GatewayStatus};
use sage_federation::logging::init_logging;
use sage_federation_core::domain::config::{FederationConfigManifest, LogFormat};

/// Sage federation gateway
#[derive(Parser)]
#[command(name = "sagefed")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "SAGE_FEDERATION_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Gateway host for client commands
    #[arg(long, global = true, env = "SAGE_GATEWAY_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Gateway port for client commands
    #[arg(long, global = true, env = "SAGE_GATEWAY_PORT", default_value = "8080")]
    port: u16,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true, env = "SAGE_FEDERATION_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit JSON logs; overrides the config file
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the federation gateway
    #[command(name = "serve")]
    Serve,

    /// Check whether a gateway is running
    #[command(name = "status")]
    Status,

    /// Node-side federation operations
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        command: NodeCommand,
    },

    /// Federation token utilities
    #[command(name = "token")]
    Token {
        #[command(subcommand)]
        command: TokenCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Federation schema management
    #[command(name = "db")]
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Discovery runs once. A broken config file must not stop `config validate`
    // from reporting it, so logging falls back to defaults.
    let loaded = FederationConfigManifest::load_or_default(cli.config.clone());
    let logging = loaded
        .as_ref()
        .map(|c| c.spec.observability.logging.clone())
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or(logging.level);
    let format = if cli.log_json { LogFormat::Json } else { logging.format };
    init_logging(&level, &format)?;

    let client = || GatewayClient::for_host(&cli.host, cli.port);

    match cli.command {
        Some(Commands::Serve) => {
            let config = loaded.context("Failed to load configuration")?;
            info!(source = %commands::config::config_source(cli.config), "Configuration loaded");
            daemon::start_gateway(config).await
        }
        Some(Commands::Status) => status(client()?).await,
        Some(Commands::Node { command }) => commands::node::handle_command(command, client()?).await,
        Some(Commands::Token { command }) => commands::token::handle_command(command, client()?).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        Some(Commands::Db { command }) => commands::db::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

async fn status(client: GatewayClient) -> Result<()> {
    match check_gateway_running(client.base_url()).await? {
        GatewayStatus::Running { uptime } => {
            println!(
                "{}",
                format!("✓ Gateway running at {} (uptime {} s)", client.base_url(), uptime).green()
            );
            match client.public_key().await {
                Ok(key) => println!("  Public key: {}", key),
                Err(e) => println!("  Public key: {}", format!("unavailable ({})", e).yellow()),
            }
        }
        GatewayStatus::Unhealthy { error } => {
            println!("{}", format!("✗ Gateway at {} is unhealthy: {}", client.base_url(), error).red());
        }
        GatewayStatus::Stopped => {
            println!("{}", format!("Gateway not reachable at {}", client.base_url()).dimmed());
        }
    }
    Ok(())
}
