// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use sage_federation_core::domain::config::{FederationConfigManifest, RoutingBackend, CONFIG_PATH_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./sage-federation.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, force } => generate(output, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = FederationConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./sage-federation.yaml");
        println!("  4. ~/.sage/federation.yaml");
        println!("  5. /etc/sage/federation.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Gateway:".bold());
    println!("  Name: {}", config.metadata.name);
    println!("  Listen: {}:{}", spec.server.bind_address, spec.server.port);
    println!();

    println!("{}", "Handshake:".bold());
    println!("  Challenge TTL: {} ms", spec.handshake.challenge_ttl_ms);
    println!("  Sweep interval: {} s", spec.handshake.sweep_interval_secs);
    println!("  Session cache TTL: {} s", spec.sessions.ttl_secs);
    println!(
        "  Signing key: {}",
        if spec.signing.seed.is_some() {
            "configured seed".normal()
        } else {
            "ephemeral (generated at startup)".yellow()
        }
    );
    println!();

    println!("{}", "Presence:".bold());
    println!("  Offline after: {} ms", spec.registry.offline_threshold_ms);
    println!("  Forget after: {} s", spec.registry.retention_secs);
    println!("  Event stream capacity: {}", spec.events.capacity);
    println!();

    println!("{}", "Routing:".bold());
    match spec.routing.backend {
        RoutingBackend::InMemory => println!("  Backend: in-memory"),
        RoutingBackend::Postgres => {
            println!("  Backend: postgres");
            println!(
                "  Database: {}",
                if spec.routing.database_url.is_some() { "(set)" } else { "(missing)" }
            );
        }
    }
    println!("  Node pool size: {}", spec.routing.max_connections);
    println!("  Probe timeout: {} ms", spec.routing.probe_timeout_ms);
    println!();

    println!("{}", "Observability:".bold());
    println!(
        "  Logging: {} ({:?})",
        spec.observability.logging.level, spec.observability.logging.format
    );
    if spec.observability.metrics.enabled {
        println!("  Metrics: enabled on port {}", spec.observability.metrics.port);
    } else {
        println!("  Metrics: disabled");
    }

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = FederationConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    FederationConfigManifest::default()
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

/// Where `load_or_default` takes its configuration from.
pub fn config_source(cli_path: Option<PathBuf>) -> String {
    cli_path
        .or_else(FederationConfigManifest::discover_config)
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_config_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("federation.yaml");

        generate(path.clone(), false).unwrap();
        let config = FederationConfigManifest::from_yaml_file(&path).unwrap();
        config.validate().unwrap();

        assert!(generate(path.clone(), false).is_err());
        generate(path, true).unwrap();
    }

    #[test]
    fn test_config_source_prefers_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("federation.yaml");
        generate(path.clone(), false).unwrap();

        assert_eq!(config_source(Some(path.clone())), path.display().to_string());
    }
}
