// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Federation Routing Contracts
//!
//! Interfaces the [`crate::infrastructure::federation_router::FederationRouter`]
//! depends on, kept free of any particular database driver.
//!
//! | Trait | Purpose | Implementations |
//! |-------|---------|-----------------|
//! | [`FederationMappingRepository`] | authoritative tenant → node mapping | `InMemoryFederationMappingRepository`, `PostgresFederationMappingRepository` |
//! | [`DataStoreConnector`] | open / probe / close a node's backing store | `MemoryConnector`, `PgConnector` |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Node id attached to the default (non-federated) connection.
pub const DEFAULT_NODE_ID: &str = "default";

/// A tenant's declared primary placement (`tenant_federation_map`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantFederationMapping {
    pub tenant_id: String,
    pub primary_node_id: String,
    pub primary_region: String,
}

/// A per-region routing override (`federation_routing`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRoute {
    pub tenant_id: String,
    pub region: String,
    pub node_id: String,
    /// Only rows marked primary for their region take part in resolution.
    pub is_primary: bool,
    pub weight: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRecordStatus {
    Active,
    Draining,
    Disabled,
}

impl NodeRecordStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "active" => Self::Active,
            "draining" => Self::Draining,
            _ => Self::Disabled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Draining => "draining",
            Self::Disabled => "disabled",
        }
    }
}

/// Connection details for a federation node (`federation_nodes`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationNodeRecord {
    pub node_id: String,
    pub database_url: String,
    pub status: NodeRecordStatus,
}

/// Routing failures. None of these reach an HTTP caller: the router degrades
/// to the default store instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("no federated route for tenant {tenant_id}: {reason}")]
    RoutingUnavailable { tenant_id: String, reason: String },

    #[error("mapping store unreachable: {0}")]
    StoreUnreachable(String),

    #[error("federation node not found: {0}")]
    NodeNotFound(String),

    #[error("federation node {node_id} is not active ({status})")]
    NodeInactive { node_id: String, status: String },

    #[error("failed to connect to node {node_id}: {reason}")]
    ConnectionFailed { node_id: String, reason: String },
}

/// Read-only view of the authoritative federation mapping tables.
#[async_trait]
pub trait FederationMappingRepository: Send + Sync {
    /// Primary placement for a tenant, if mapped.
    async fn find_tenant_mapping(
        &self,
        tenant_id: &str,
    ) -> Result<Option<TenantFederationMapping>, RoutingError>;

    /// Highest-weight primary route for `(tenant_id, region)`.
    async fn find_region_route(
        &self,
        tenant_id: &str,
        region: &str,
    ) -> Result<Option<String>, RoutingError>;

    /// Connection record for a node.
    async fn find_node(&self, node_id: &str) -> Result<Option<FederationNodeRecord>, RoutingError>;
}

/// Opens and health-checks connections to a node's backing store.
#[async_trait]
pub trait DataStoreConnector: Send + Sync + 'static {
    type Connection: Clone + Send + Sync + 'static;

    async fn connect(&self, node_id: &str, database_url: &str) -> Result<Self::Connection, RoutingError>;

    /// Bounded-time liveness probe. An error means "unavailable", not fatal.
    async fn ping(&self, connection: &Self::Connection) -> Result<(), RoutingError>;

    async fn close(&self, connection: Self::Connection);
}

/// A resolved backing-store connection and the node it belongs to.
#[derive(Debug, Clone)]
pub struct RoutedConnection<C> {
    pub node_id: String,
    pub connection: C,
}

impl<C> RoutedConnection<C> {
    pub fn is_default(&self) -> bool {
        self.node_id == DEFAULT_NODE_ID
    }
}
