// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! In-process stand-in for a node's backing store.
//!
//! Used by the in-memory routing backend and by tests. A "connection" is a
//! cheap handle naming the node and URL it was opened for; reachability is
//! toggled per URL.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::routing::{DataStoreConnector, RoutingError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConnection {
    pub node_id: String,
    pub database_url: String,
    /// Distinguishes separate opens of the same URL.
    pub generation: u64,
}

#[derive(Debug, Default)]
struct ConnectorState {
    unreachable: HashSet<String>,
    connects: HashMap<String, u64>,
    closed: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<RwLock<ConnectorState>>,
    generation: Arc<AtomicU64>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects to, and pings of, this URL fail until cleared.
    pub fn mark_unreachable(&self, database_url: &str) {
        self.state.write().unreachable.insert(database_url.to_string());
    }

    pub fn mark_reachable(&self, database_url: &str) {
        self.state.write().unreachable.remove(database_url);
    }

    /// Successful connects made for `node_id`.
    pub fn connect_count(&self, node_id: &str) -> u64 {
        self.state.read().connects.get(node_id).copied().unwrap_or(0)
    }

    pub fn closed_count(&self) -> u64 {
        self.state.read().closed
    }

    fn is_unreachable(&self, database_url: &str) -> bool {
        self.state.read().unreachable.contains(database_url)
    }
}

#[async_trait]
impl DataStoreConnector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(&self, node_id: &str, database_url: &str) -> Result<MemoryConnection, RoutingError> {
        if self.is_unreachable(database_url) {
            return Err(RoutingError::ConnectionFailed {
                node_id: node_id.to_string(),
                reason: format!("{} is unreachable", database_url),
            });
        }

        *self.state.write().connects.entry(node_id.to_string()).or_insert(0) += 1;
        Ok(MemoryConnection {
            node_id: node_id.to_string(),
            database_url: database_url.to_string(),
            generation: self.generation.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn ping(&self, connection: &MemoryConnection) -> Result<(), RoutingError> {
        if self.is_unreachable(&connection.database_url) {
            return Err(RoutingError::StoreUnreachable(connection.database_url.clone()));
        }
        Ok(())
    }

    async fn close(&self, _connection: MemoryConnection) {
        self.state.write().closed += 1;
    }
}
