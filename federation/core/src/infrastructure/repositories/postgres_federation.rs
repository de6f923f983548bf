// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Federation Mapping Repository
//!
//! Reads the authoritative tenant placement from the default database:
//!
//! | Table | Lookup |
//! |-------|--------|
//! | `tenant_federation_map` | primary node + region for a tenant |
//! | `federation_routing` | highest-weight primary route for (tenant, region) |
//! | `federation_nodes` | database URL and status for a node |
//!
//! Schema lives in `migrations/`. Any driver error is reported as
//! `RoutingError::StoreUnreachable`; the router decides what to do with it.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::routing::{
    FederationMappingRepository, FederationNodeRecord, NodeRecordStatus, RoutingError,
    TenantFederationMapping,
};

pub struct PostgresFederationMappingRepository {
    pool: PgPool,
}

impl PostgresFederationMappingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unreachable(e: sqlx::Error) -> RoutingError {
    RoutingError::StoreUnreachable(e.to_string())
}

#[async_trait]
impl FederationMappingRepository for PostgresFederationMappingRepository {
    async fn find_tenant_mapping(
        &self,
        tenant_id: &str,
    ) -> Result<Option<TenantFederationMapping>, RoutingError> {
        let row = sqlx::query(
            r#"
            SELECT primary_node_id, primary_region
            FROM public.tenant_federation_map
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unreachable)?;

        Ok(row.map(|row| TenantFederationMapping {
            tenant_id: tenant_id.to_string(),
            primary_node_id: row.get("primary_node_id"),
            primary_region: row.get("primary_region"),
        }))
    }

    async fn find_region_route(
        &self,
        tenant_id: &str,
        region: &str,
    ) -> Result<Option<String>, RoutingError> {
        let row = sqlx::query(
            r#"
            SELECT node_id
            FROM public.federation_routing
            WHERE tenant_id = $1 AND region = $2 AND is_primary = true
            ORDER BY weight DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(region)
        .fetch_optional(&self.pool)
        .await
        .map_err(unreachable)?;

        Ok(row.map(|row| row.get("node_id")))
    }

    async fn find_node(&self, node_id: &str) -> Result<Option<FederationNodeRecord>, RoutingError> {
        let row = sqlx::query(
            r#"
            SELECT database_url, status
            FROM public.federation_nodes
            WHERE node_id = $1
            "#,
        )
        .bind(node_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unreachable)?;

        Ok(row.map(|row| {
            let status: String = row.get("status");
            FederationNodeRecord {
                node_id: node_id.to_string(),
                database_url: row.get("database_url"),
                status: NodeRecordStatus::parse(&status),
            }
        }))
    }
}
