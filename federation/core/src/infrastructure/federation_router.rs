// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Federation Router
//!
//! Picks the backing-store connection for a `(tenant, region)` pair.
//!
//! ```text
//! tenant mapping and (region empty or == primary_region) ──▶ primary node
//!      │otherwise                                              │fail
//!      ▼                                                       ▼
//! region non-empty: region route (is_primary, max weight) ──ok──▶ route node
//!      │none / connect failed
//!      ▼
//! primary node (if mapped) ──────────fail / unmapped──────▶ RoutingUnavailable
//! ```
//!
//! [`FederationRouter::try_resolve`] reports `RoutingUnavailable` and leaves
//! the decision to the caller. [`FederationRouter::resolve`] is the explicit
//! downgrade: it logs the reason and hands back the default connection
//! tagged `"default"`.
//!
//! Node connections are cached by node id. A cached connection is probed
//! before reuse; a failed probe evicts and closes it and a fresh connection
//! is opened. Connections are only opened for nodes whose record is `active`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::domain::routing::{
    DataStoreConnector, FederationMappingRepository, NodeRecordStatus, RoutedConnection,
    RoutingError, DEFAULT_NODE_ID,
};

pub struct FederationRouter<C: DataStoreConnector> {
    repository: Arc<dyn FederationMappingRepository>,
    connector: C,
    default_connection: C::Connection,
    cache: RwLock<HashMap<String, C::Connection>>,
}

impl<C: DataStoreConnector> FederationRouter<C> {
    pub fn new(
        repository: Arc<dyn FederationMappingRepository>,
        connector: C,
        default_connection: C::Connection,
    ) -> Self {
        Self {
            repository,
            connector,
            default_connection,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve to a federated node, or explain why none applies.
    pub async fn try_resolve(
        &self,
        tenant_id: &str,
        region: &str,
    ) -> Result<RoutedConnection<C::Connection>, RoutingError> {
        let unavailable = |reason: String| RoutingError::RoutingUnavailable {
            tenant_id: tenant_id.to_string(),
            reason,
        };

        if tenant_id.is_empty() {
            return Err(unavailable("no tenant supplied".to_string()));
        }

        // A missing or unreadable mapping still leaves the region route to try.
        let mapping = match self.repository.find_tenant_mapping(tenant_id).await {
            Ok(mapping) => mapping,
            Err(e) => {
                warn!(tenant_id = %tenant_id, error = %e, "Tenant mapping lookup failed");
                None
            }
        };

        if let Some(mapping) = &mapping {
            if region.is_empty() || region == mapping.primary_region {
                return self
                    .routed(&mapping.primary_node_id)
                    .await
                    .map_err(|e| unavailable(e.to_string()));
            }
        }

        if !region.is_empty() {
            match self.repository.find_region_route(tenant_id, region).await {
                Ok(Some(node_id)) => match self.routed(&node_id).await {
                    Ok(routed) => return Ok(routed),
                    Err(e) => {
                        warn!(tenant_id = %tenant_id, region = %region, node_id = %node_id, error = %e,
                            "Region route unusable");
                    }
                },
                Ok(None) => {
                    debug!(tenant_id = %tenant_id, region = %region, "No region route");
                }
                Err(e) => {
                    warn!(tenant_id = %tenant_id, region = %region, error = %e, "Region route lookup failed");
                }
            }
        }

        match mapping {
            Some(mapping) => self
                .routed(&mapping.primary_node_id)
                .await
                .map_err(|e| unavailable(e.to_string())),
            None => Err(unavailable("tenant has no federation mapping or region route".to_string())),
        }
    }

    /// Resolve, downgrading any routing failure to the default connection.
    pub async fn resolve(&self, tenant_id: &str, region: &str) -> RoutedConnection<C::Connection> {
        match self.try_resolve(tenant_id, region).await {
            Ok(routed) => {
                metrics::counter!("sage_federation_routing_resolutions_total", "outcome" => "federated")
                    .increment(1);
                routed
            }
            Err(e) => {
                if !tenant_id.is_empty() {
                    warn!(tenant_id = %tenant_id, region = %region, error = %e,
                        "Federation routing unavailable, using default store");
                }
                metrics::counter!("sage_federation_routing_resolutions_total", "outcome" => "default")
                    .increment(1);
                self.default_route()
            }
        }
    }

    pub fn default_route(&self) -> RoutedConnection<C::Connection> {
        RoutedConnection {
            node_id: DEFAULT_NODE_ID.to_string(),
            connection: self.default_connection.clone(),
        }
    }

    async fn routed(&self, node_id: &str) -> Result<RoutedConnection<C::Connection>, RoutingError> {
        let connection = self.connection_for(node_id).await?;
        Ok(RoutedConnection {
            node_id: node_id.to_string(),
            connection,
        })
    }

    async fn connection_for(&self, node_id: &str) -> Result<C::Connection, RoutingError> {
        let cached = self.cache.read().get(node_id).cloned();
        if let Some(connection) = cached {
            match self.connector.ping(&connection).await {
                Ok(()) => return Ok(connection),
                Err(e) => {
                    warn!(node_id = %node_id, error = %e, "Cached node connection failed probe, reconnecting");
                    self.cache.write().remove(node_id);
                    self.connector.close(connection).await;
                    metrics::counter!("sage_federation_connection_evictions_total").increment(1);
                }
            }
        }

        let record = self
            .repository
            .find_node(node_id)
            .await?
            .ok_or_else(|| RoutingError::NodeNotFound(node_id.to_string()))?;

        if record.status != NodeRecordStatus::Active {
            return Err(RoutingError::NodeInactive {
                node_id: node_id.to_string(),
                status: record.status.as_str().to_string(),
            });
        }

        let connection = self.connector.connect(node_id, &record.database_url).await?;

        // A concurrent resolve may have connected first; keep theirs.
        let existing = match self.cache.write().entry(node_id.to_string()) {
            Entry::Occupied(entry) => Some(entry.get().clone()),
            Entry::Vacant(entry) => {
                entry.insert(connection.clone());
                None
            }
        };

        match existing {
            Some(existing) => {
                self.connector.close(connection).await;
                Ok(existing)
            }
            None => {
                info!(node_id = %node_id, "Opened federation node connection");
                Ok(connection)
            }
        }
    }

    /// Drop a node's cached connection, closing it.
    pub async fn invalidate(&self, node_id: &str) -> bool {
        let removed = self.cache.write().remove(node_id);
        match removed {
            Some(connection) => {
                self.connector.close(connection).await;
                true
            }
            None => false,
        }
    }

    /// Node ids with a cached connection, sorted.
    pub fn cached_nodes(&self) -> Vec<String> {
        let mut nodes: Vec<String> = self.cache.read().keys().cloned().collect();
        nodes.sort();
        nodes
    }

    /// Close and forget every cached node connection.
    pub async fn close_all(&self) {
        let drained: Vec<(String, C::Connection)> = self.cache.write().drain().collect();
        let count = drained.len();
        for (_, connection) in drained {
            self.connector.close(connection).await;
        }
        if count > 0 {
            info!(count, "Closed federation node connections");
        }
    }
}
