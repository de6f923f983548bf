// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Gateway HTTP server and composition root
//!
//! Builds every federation store and service from the loaded manifest, picks
//! the routing backend, and serves the federation API until Ctrl+C/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use sage_federation_core::application::{
    FederationAuthService, FederationSweeper, FederationSweeperConfig, MessageClassifier,
};
use sage_federation_core::domain::clock::{Clock, SystemClock};
use sage_federation_core::domain::config::{FederationConfigManifest, RoutingBackend};
use sage_federation_core::domain::routing::{DataStoreConnector, DEFAULT_NODE_ID};
use sage_federation_core::infrastructure::db::{Database, PgConnector};
use sage_federation_core::infrastructure::memory_store::{MemoryConnection, MemoryConnector};
use sage_federation_core::infrastructure::repositories::{
    InMemoryFederationMappingRepository, PostgresFederationMappingRepository,
};
use sage_federation_core::infrastructure::{
    EventStream, FederationRouter, FederationSigner, HandshakeStore, NodeRegistry, SessionCache,
    TokenCodec,
};
use sage_federation_core::presentation::{app, AppState};

/// Backend-independent half of the gateway.
struct GatewayServices {
    clock: Arc<dyn Clock>,
    auth: Arc<FederationAuthService>,
    classifier: Arc<MessageClassifier>,
    sweeper: Arc<FederationSweeper>,
}

impl GatewayServices {
    fn build(config: &FederationConfigManifest) -> Result<Self> {
        let spec = &config.spec;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let signer = match config.signing_seed()? {
            Some(seed) => FederationSigner::from_seed_base64(&seed)
                .context("Failed to load federation signing key")?,
            None => {
                warn!("No signing seed configured; generated an ephemeral key. Issued tokens will not survive a restart.");
                FederationSigner::generate()
            }
        };
        info!(public_key = %signer.public_key_base64(), "Federation signing key ready");

        let handshakes = Arc::new(HandshakeStore::new(clock.clone(), spec.handshake.challenge_ttl()));
        let sessions = Arc::new(SessionCache::new(clock.clone()));
        let codec = TokenCodec::new(Arc::new(signer));
        let auth = Arc::new(FederationAuthService::new(
            handshakes.clone(),
            sessions.clone(),
            codec,
            clock.clone(),
        ));

        let registry = Arc::new(NodeRegistry::new(clock.clone(), spec.registry.offline_threshold_ms));
        let events = Arc::new(EventStream::new(clock.clone(), spec.events.capacity));
        let classifier = Arc::new(MessageClassifier::new(registry.clone(), events));

        let sweeper = Arc::new(FederationSweeper::new(
            handshakes,
            sessions,
            registry,
            FederationSweeperConfig {
                interval: Duration::from_secs(spec.handshake.sweep_interval_secs),
                session_ttl: spec.sessions.ttl(),
                node_retention: spec.registry.retention(),
            },
        ));

        Ok(Self {
            clock,
            auth,
            classifier,
            sweeper,
        })
    }
}

pub async fn start_gateway(config: FederationConfigManifest) -> Result<()> {
    config.validate().context("Configuration validation failed")?;
    info!(name = %config.metadata.name, backend = ?config.spec.routing.backend, "Federation gateway starting");

    if config.spec.observability.metrics.enabled {
        install_metrics_exporter(&config.spec.server.bind_address, config.spec.observability.metrics.port)?;
    }

    let services = GatewayServices::build(&config)?;
    let routing = &config.spec.routing;

    match routing.backend {
        RoutingBackend::InMemory => {
            warn!("Using in-memory federation mappings; every tenant resolves to the default store");
            let router = FederationRouter::new(
                Arc::new(InMemoryFederationMappingRepository::new()),
                MemoryConnector::new(),
                MemoryConnection {
                    node_id: DEFAULT_NODE_ID.to_string(),
                    database_url: "mem://default".to_string(),
                    generation: u64::MAX,
                },
            );
            serve(&config, services, router).await
        }
        RoutingBackend::Postgres => {
            let url = config
                .database_url()?
                .context("spec.routing.database_url is required for the postgres backend")?;
            let database = Database::new(&url, routing.max_connections).await?;
            database.migrate().await?;
            info!("Default database connected and migrated");

            let pool = database.get_pool().clone();
            let router = FederationRouter::new(
                Arc::new(PostgresFederationMappingRepository::new(pool.clone())),
                PgConnector::new(routing.max_connections, Duration::from_millis(routing.probe_timeout_ms)),
                pool,
            );
            serve(&config, services, router).await
        }
    }
}

async fn serve<C: DataStoreConnector>(
    config: &FederationConfigManifest,
    services: GatewayServices,
    router: FederationRouter<C>,
) -> Result<()> {
    let state = Arc::new(AppState::new(
        services.auth,
        services.classifier,
        Arc::new(router),
        services.clock,
    ));

    let sweeper_shutdown = services.sweeper.shutdown_token();
    let sweeper_handle = services.sweeper.start();

    let addr = format!("{}:{}", config.spec.server.bind_address, config.spec.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Federation gateway listening on {}", addr);

    let served = axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed");

    info!("Federation gateway shutting down");
    sweeper_shutdown.cancel();
    if let Err(e) = sweeper_handle.await {
        error!("Federation sweeper task failed: {}", e);
    }
    state.router.close_all().await;

    served
}

fn install_metrics_exporter(bind_address: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .with_context(|| format!("Invalid metrics listen address {}:{}", bind_address, port))?;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    describe_metrics();
    info!("Prometheus metrics exposed on {}", addr);
    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!("sage_federation_handshakes_total", "Handshake challenges issued");
    metrics::describe_counter!(
        "sage_federation_assertions_total",
        "Handshake assertions by outcome"
    );
    metrics::describe_counter!(
        "sage_federation_token_verifications_total",
        "Federation token signature checks by outcome"
    );
    metrics::describe_counter!("sage_federation_bus_messages_total", "Bus messages by type");
    metrics::describe_counter!(
        "sage_federation_routing_resolutions_total",
        "Tenant routing decisions by outcome"
    );
    metrics::describe_counter!(
        "sage_federation_connection_evictions_total",
        "Cached node connections dropped after a failed probe"
    );
    metrics::describe_counter!(
        "sage_federation_sweep_evictions_total",
        "Entries removed by the background sweeper, by store"
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
