// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of [`FederationMappingRepository`].
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Read the tenant → node federation mapping
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **PostgresFederationMappingRepository** - `tenant_federation_map`,
//!   `federation_routing` and `federation_nodes` tables
//! - **InMemoryFederationMappingRepository** - HashMap-backed, for tests and
//!   single-process deployments; can be told to act unreachable

pub mod postgres_federation;

pub use postgres_federation::PostgresFederationMappingRepository;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::routing::{
    FederationMappingRepository, FederationNodeRecord, RegionRoute, RoutingError,
    TenantFederationMapping,
};

#[derive(Default)]
pub struct InMemoryFederationMappingRepository {
    mappings: RwLock<HashMap<String, TenantFederationMapping>>,
    routes: RwLock<Vec<RegionRoute>>,
    nodes: RwLock<HashMap<String, FederationNodeRecord>>,
    unreachable: AtomicBool,
}

impl InMemoryFederationMappingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_tenant_mapping(&self, mapping: TenantFederationMapping) {
        self.mappings.write().insert(mapping.tenant_id.clone(), mapping);
    }

    pub fn add_region_route(&self, route: RegionRoute) {
        self.routes.write().push(route);
    }

    pub fn upsert_node(&self, node: FederationNodeRecord) {
        self.nodes.write().insert(node.node_id.clone(), node);
    }

    /// Make every lookup fail with `StoreUnreachable`.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), RoutingError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RoutingError::StoreUnreachable("in-memory store marked unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FederationMappingRepository for InMemoryFederationMappingRepository {
    async fn find_tenant_mapping(
        &self,
        tenant_id: &str,
    ) -> Result<Option<TenantFederationMapping>, RoutingError> {
        self.check_reachable()?;
        Ok(self.mappings.read().get(tenant_id).cloned())
    }

    async fn find_region_route(
        &self,
        tenant_id: &str,
        region: &str,
    ) -> Result<Option<String>, RoutingError> {
        self.check_reachable()?;
        let routes = self.routes.read();
        let best = routes
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.region == region && r.is_primary)
            // max_by_key keeps the last maximum; reverse so the first-inserted wins ties
            .rev()
            .max_by_key(|r| r.weight)
            .map(|r| r.node_id.clone());
        Ok(best)
    }

    async fn find_node(&self, node_id: &str) -> Result<Option<FederationNodeRecord>, RoutingError> {
        self.check_reachable()?;
        Ok(self.nodes.read().get(node_id).cloned())
    }
}
