// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Federation Sweeper - background eviction for the in-memory federation stores
//!
//! Each tick drops expired handshake challenges, session cache entries older
//! than the session TTL and nodes silent past the retention window.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Bound memory of the handshake store, session cache and node registry
//! - **Lifecycle:** Started by the daemon; stopped through its `CancellationToken`

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::infrastructure::handshake_store::HandshakeStore;
use crate::infrastructure::node_registry::NodeRegistry;
use crate::infrastructure::session_cache::SessionCache;

#[derive(Debug, Clone)]
pub struct FederationSweeperConfig {
    /// How often to sweep
    pub interval: Duration,

    /// Session cache entries older than this are dropped
    pub session_ttl: chrono::Duration,

    /// Nodes silent for longer than this are forgotten
    pub node_retention: chrono::Duration,
}

impl Default for FederationSweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            session_ttl: chrono::Duration::hours(1),
            node_retention: chrono::Duration::days(1),
        }
    }
}

/// Counts removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub challenges: usize,
    pub sessions: usize,
    pub nodes: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.challenges + self.sessions + self.nodes
    }
}

pub struct FederationSweeper {
    handshakes: Arc<HandshakeStore>,
    sessions: Arc<SessionCache>,
    registry: Arc<NodeRegistry>,
    config: FederationSweeperConfig,
    shutdown_token: CancellationToken,
}

impl FederationSweeper {
    pub fn new(
        handshakes: Arc<HandshakeStore>,
        sessions: Arc<SessionCache>,
        registry: Arc<NodeRegistry>,
        config: FederationSweeperConfig,
    ) -> Self {
        Self {
            handshakes,
            sessions,
            registry,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Handle that stops the sweep loop when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting federation sweeper"
        );

        let mut tick = interval(self.config.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can have expired yet.
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let report = self.sweep_once();
                    if report.total() > 0 {
                        info!(
                            challenges = report.challenges,
                            sessions = report.sessions,
                            nodes = report.nodes,
                            "Federation sweep evicted entries"
                        );
                    } else {
                        debug!("Federation sweep found nothing to evict");
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping federation sweeper");
                    break;
                }
            }
        }

        info!("Federation sweeper stopped");
    }

    /// Run one sweep over every store.
    pub fn sweep_once(&self) -> SweepReport {
        let report = SweepReport {
            challenges: self.handshakes.sweep_expired(),
            sessions: self.sessions.sweep_expired(self.config.session_ttl),
            nodes: self.registry.sweep_stale(self.config.node_retention),
        };

        metrics::counter!("sage_federation_sweep_evictions_total", "store" => "challenges")
            .increment(report.challenges as u64);
        metrics::counter!("sage_federation_sweep_evictions_total", "store" => "sessions")
            .increment(report.sessions as u64);
        metrics::counter!("sage_federation_sweep_evictions_total", "store" => "nodes")
            .increment(report.nodes as u64);

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;

    fn sweeper(clock: Arc<ManualClock>) -> FederationSweeper {
        FederationSweeper::new(
            Arc::new(HandshakeStore::new(clock.clone(), chrono::Duration::seconds(30))),
            Arc::new(SessionCache::new(clock.clone())),
            Arc::new(NodeRegistry::new(clock, 45_000)),
            FederationSweeperConfig::default(),
        )
    }

    #[test]
    fn test_sweep_once_covers_all_stores() {
        let clock = Arc::new(ManualClock::starting_now());
        let sweeper = sweeper(clock.clone());

        sweeper.handshakes.begin("n", "t", "f").unwrap();
        sweeper.sessions.register("tok");
        sweeper.registry.heartbeat("n");

        assert_eq!(sweeper.sweep_once(), SweepReport::default());

        clock.advance(chrono::Duration::days(2));
        assert_eq!(
            sweeper.sweep_once(),
            SweepReport { challenges: 1, sessions: 1, nodes: 1 }
        );
    }

    #[tokio::test]
    async fn test_stops_on_cancel() {
        let sweeper = Arc::new(sweeper(Arc::new(ManualClock::starting_now())));
        let token = sweeper.shutdown_token();
        let handle = sweeper.start();

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
