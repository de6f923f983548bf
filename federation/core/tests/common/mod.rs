// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use sage_federation_core::application::{FederationAuthService, MessageClassifier};
use sage_federation_core::domain::clock::{Clock, ManualClock};
use sage_federation_core::domain::routing::{
    FederationNodeRecord, NodeRecordStatus, RegionRoute, TenantFederationMapping, DEFAULT_NODE_ID,
};
use sage_federation_core::infrastructure::memory_store::{MemoryConnection, MemoryConnector};
use sage_federation_core::infrastructure::repositories::InMemoryFederationMappingRepository;
use sage_federation_core::infrastructure::{
    EventStream, FederationRouter, FederationSigner, HandshakeStore, NodeRegistry, SessionCache,
    TokenCodec,
};
use sage_federation_core::presentation::AppState;

/// Fully wired in-memory gateway with a manual clock.
pub struct TestGateway {
    pub clock: Arc<ManualClock>,
    pub repository: Arc<InMemoryFederationMappingRepository>,
    pub connector: MemoryConnector,
    pub state: Arc<AppState<MemoryConnector>>,
}

pub fn default_connection() -> MemoryConnection {
    MemoryConnection {
        node_id: DEFAULT_NODE_ID.to_string(),
        database_url: "mem://default".to_string(),
        generation: u64::MAX,
    }
}

impl TestGateway {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let dyn_clock: Arc<dyn Clock> = clock.clone();

        let handshakes = Arc::new(HandshakeStore::new(dyn_clock.clone(), Duration::milliseconds(30_000)));
        let sessions = Arc::new(SessionCache::new(dyn_clock.clone()));
        let codec = TokenCodec::new(Arc::new(FederationSigner::generate()));
        let auth = Arc::new(FederationAuthService::new(handshakes, sessions, codec, dyn_clock.clone()));

        let registry = Arc::new(NodeRegistry::new(dyn_clock.clone(), 45_000));
        let events = Arc::new(EventStream::new(dyn_clock.clone(), 200));
        let classifier = Arc::new(MessageClassifier::new(registry, events));

        let repository = Arc::new(InMemoryFederationMappingRepository::new());
        let connector = MemoryConnector::new();
        let router = Arc::new(FederationRouter::new(
            repository.clone(),
            connector.clone(),
            default_connection(),
        ));

        let state = Arc::new(AppState::new(auth, classifier, router, dyn_clock));

        Self {
            clock,
            repository,
            connector,
            state,
        }
    }

    /// Map `tenant` to `primary_node` in `primary_region`, registering the node as active.
    pub fn map_tenant(&self, tenant: &str, primary_node: &str, primary_region: &str) {
        self.add_node(primary_node, NodeRecordStatus::Active);
        self.repository.upsert_tenant_mapping(TenantFederationMapping {
            tenant_id: tenant.to_string(),
            primary_node_id: primary_node.to_string(),
            primary_region: primary_region.to_string(),
        });
    }

    pub fn add_node(&self, node_id: &str, status: NodeRecordStatus) {
        self.repository.upsert_node(FederationNodeRecord {
            node_id: node_id.to_string(),
            database_url: format!("mem://{}", node_id),
            status,
        });
    }

    pub fn add_route(&self, tenant: &str, region: &str, node_id: &str, weight: i32) {
        self.add_node(node_id, NodeRecordStatus::Active);
        self.repository.add_region_route(RegionRoute {
            tenant_id: tenant.to_string(),
            region: region.to_string(),
            node_id: node_id.to_string(),
            is_primary: true,
            weight,
        });
    }

    pub fn auth(&self) -> &FederationAuthService {
        &self.state.auth
    }
}
