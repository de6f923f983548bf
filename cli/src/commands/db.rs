// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Federation Schema Migration Command
//!
//! `sagefed db migrate` applies the embedded migrations that create the
//! federation mapping tables (`federation_nodes`, `tenant_federation_map`,
//! `federation_routing`) on the default database.
//!
//! # Usage
//!
//! ```bash
//! # Apply all pending migrations
//! sagefed db migrate
//!
//! # Preview migrations without applying
//! sagefed db migrate --dry-run
//! ```
//!
//! The database URL comes from `spec.routing.database_url` or
//! `SAGE_FEDERATION_DATABASE_URL`.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use sage_federation_core::domain::config::FederationConfigManifest;
use sage_federation_core::infrastructure::db::{Database, MIGRATOR};

#[derive(Subcommand)]
pub enum DbCommand {
    /// Apply pending federation schema migrations
    Migrate {
        /// Perform a dry run without applying changes
        #[arg(long)]
        dry_run: bool,
    },
}

pub async fn handle_command(command: DbCommand, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        DbCommand::Migrate { dry_run } => migrate(config_path, dry_run).await,
    }
}

async fn migrate(config_path: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let config = FederationConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    let database_url = config.database_url()?.context(
        "No database configured. Set spec.routing.database_url or SAGE_FEDERATION_DATABASE_URL.",
    )?;

    println!("Connecting to database...");
    let database = Database::new(&database_url, 1).await?;

    let applied_count = sqlx::query("SELECT version FROM _sqlx_migrations")
        .fetch_all(database.get_pool())
        .await
        .map(|rows| rows.len())
        .unwrap_or(0);
    let total_migrations = MIGRATOR.iter().count();

    println!(
        "Migration status: {} applied, {} total available.",
        applied_count, total_migrations
    );

    if applied_count >= total_migrations {
        println!("{}", "✓ Federation schema is up to date.".green());
        return Ok(());
    }

    if dry_run {
        println!("Pending migrations found (Dry Run):");
        for migration in MIGRATOR.iter().skip(applied_count) {
            println!(" - {} {}", migration.version, migration.description);
        }
        println!("Skipping application due to --dry-run");
        return Ok(());
    }

    println!("Applying pending migrations...");
    database.migrate().await?;
    println!("{}", "✓ Federation schema updated successfully.".green());

    Ok(())
}
