// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Node Registry
//!
//! Last-heartbeat time per node. Liveness is computed on every read from the
//! offline threshold; only [`NodeRegistry::sweep_stale`] ever removes a node.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use parking_lot::RwLock;

use crate::domain::clock::Clock;
use crate::domain::node::NodeStatus;

pub struct NodeRegistry {
    // node id -> last heartbeat (unix ms)
    last_seen: RwLock<HashMap<String, i64>>,
    clock: Arc<dyn Clock>,
    offline_threshold_ms: i64,
}

impl NodeRegistry {
    pub fn new(clock: Arc<dyn Clock>, offline_threshold_ms: i64) -> Self {
        Self {
            last_seen: RwLock::new(HashMap::new()),
            clock,
            offline_threshold_ms,
        }
    }

    pub fn heartbeat(&self, node_id: &str) {
        let now = self.clock.now_millis();
        self.last_seen.write().insert(node_id.to_string(), now);
    }

    /// All known nodes, ordered by node id.
    pub fn list(&self) -> Vec<NodeStatus> {
        let now = self.clock.now_millis();
        let mut nodes: Vec<NodeStatus> = self
            .last_seen
            .read()
            .iter()
            .map(|(id, seen)| NodeStatus::at(id.clone(), *seen, now, self.offline_threshold_ms))
            .collect();
        nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        nodes
    }

    pub fn get(&self, node_id: &str) -> Option<NodeStatus> {
        let now = self.clock.now_millis();
        self.last_seen
            .read()
            .get(node_id)
            .map(|seen| NodeStatus::at(node_id, *seen, now, self.offline_threshold_ms))
    }

    /// Forget nodes silent for longer than `retention`.
    pub fn sweep_stale(&self, retention: Duration) -> usize {
        let cutoff = self.clock.now_millis() - retention.num_milliseconds();
        let mut last_seen = self.last_seen.write();
        let before = last_seen.len();
        last_seen.retain(|_, seen| *seen >= cutoff);
        before - last_seen.len()
    }

    pub fn len(&self) -> usize {
        self.last_seen.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::domain::node::{NodeLiveness, OFFLINE_THRESHOLD_MS};

    fn registry() -> (Arc<ManualClock>, NodeRegistry) {
        let clock = Arc::new(ManualClock::starting_now());
        (clock.clone(), NodeRegistry::new(clock, OFFLINE_THRESHOLD_MS))
    }

    #[test]
    fn test_offline_after_threshold() {
        let (clock, registry) = registry();
        registry.heartbeat("node-1");

        clock.advance_millis(44_999);
        assert_eq!(registry.get("node-1").unwrap().status, NodeLiveness::Online);

        clock.advance_millis(2);
        assert_eq!(registry.get("node-1").unwrap().status, NodeLiveness::Offline);

        registry.heartbeat("node-1");
        assert!(registry.get("node-1").unwrap().is_online());
    }

    #[test]
    fn test_unknown_node() {
        let (_, registry) = registry();
        assert!(registry.get("ghost").is_none());
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_list_sorted() {
        let (_, registry) = registry();
        registry.heartbeat("b");
        registry.heartbeat("a");
        let ids: Vec<_> = registry.list().into_iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_sweep_stale() {
        let (clock, registry) = registry();
        registry.heartbeat("gone");
        clock.advance(Duration::hours(2));
        registry.heartbeat("here");

        assert_eq!(registry.sweep_stale(Duration::hours(1)), 1);
        assert!(registry.get("gone").is_none());
        assert!(registry.get("here").is_some());
    }
}
