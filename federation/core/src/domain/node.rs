// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Node Presence
//!
//! Liveness of a federated node is *derived*: only the last heartbeat time is
//! stored, and every read recomputes `offline = (now - last_seen) > threshold`.

use serde::{Deserialize, Serialize};

/// Default silence after which a node reads as offline, in milliseconds.
pub const OFFLINE_THRESHOLD_MS: i64 = 45_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeLiveness {
    Online,
    Offline,
}

impl NodeLiveness {
    /// Derive liveness from the elapsed silence.
    pub fn derive(last_seen_ms: i64, now_ms: i64, threshold_ms: i64) -> Self {
        if now_ms - last_seen_ms > threshold_ms {
            Self::Offline
        } else {
            Self::Online
        }
    }
}

/// Point-in-time view of a node, as returned by the registry.
///
/// `ts` and `lastSeen` both carry the last heartbeat in Unix milliseconds;
/// dashboards read either name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub node_id: String,
    pub ts: i64,
    pub last_seen: i64,
    pub status: NodeLiveness,
}

impl NodeStatus {
    pub fn at(node_id: impl Into<String>, last_seen_ms: i64, now_ms: i64, threshold_ms: i64) -> Self {
        Self {
            node_id: node_id.into(),
            ts: last_seen_ms,
            last_seen: last_seen_ms,
            status: NodeLiveness::derive(last_seen_ms, now_ms, threshold_ms),
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == NodeLiveness::Online
    }
}
