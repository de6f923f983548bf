// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pools
//!
//! [`Database`] wraps the default (non-federated) `PgPool`, which also holds
//! the federation mapping tables. [`PgConnector`] opens one pool per
//! federation node for the router and probes cached pools with `SELECT 1`
//! under a timeout.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::domain::routing::{DataStoreConnector, RoutingError};

/// Embedded schema for the federation mapping tables.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await
            .context("Failed to connect to default database")?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .context("Failed to apply federation migrations")?;
        Ok(())
    }
}

/// Opens per-node PostgreSQL pools for the federation router.
#[derive(Debug, Clone)]
pub struct PgConnector {
    max_connections: u32,
    probe_timeout: Duration,
}

impl PgConnector {
    pub fn new(max_connections: u32, probe_timeout: Duration) -> Self {
        Self {
            max_connections,
            probe_timeout,
        }
    }
}

#[async_trait]
impl DataStoreConnector for PgConnector {
    type Connection = PgPool;

    async fn connect(&self, node_id: &str, database_url: &str) -> Result<PgPool, RoutingError> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.probe_timeout)
            .connect(database_url)
            .await
            .map_err(|e| RoutingError::ConnectionFailed {
                node_id: node_id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn ping(&self, connection: &PgPool) -> Result<(), RoutingError> {
        let probe = sqlx::query("SELECT 1").execute(connection);
        match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RoutingError::StoreUnreachable(e.to_string())),
            Err(_) => Err(RoutingError::StoreUnreachable(format!(
                "liveness probe exceeded {} ms",
                self.probe_timeout.as_millis()
            ))),
        }
    }

    async fn close(&self, connection: PgPool) {
        connection.close().await;
    }
}
