// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Federation HTTP API
//!
//! | Route | Guard | Purpose |
//! |-------|-------|---------|
//! | `POST /api/federation/auth/handshake` | - | issue challenge |
//! | `POST /api/federation/auth/assert` | - | answer challenge, receive token |
//! | `POST /api/federation/auth/verify` | - | check a token's signature |
//! | `POST /api/federation/auth/node/join` | - | verify + register a node's token |
//! | `GET  /api/federation/auth/export` | - | echo a token for operator export |
//! | `POST /api/federation/auth/import` | - | accept a token, validated at use |
//! | `GET  /api/federation/auth/public-key` | - | token verification key |
//! | `POST /api/federation/agents/{telemetry,commands,jobs}` | token | agent calls |
//! | `GET  /api/federation/agents/status` | token | agent's own presence |
//! | `POST /api/federation/bus` | token | typed bus message |
//! | `GET  /federation/nodes`, `/federation/nodes/status`, `/federation/events` | - | presence and event views |
//! | `GET  /federation/api/route` | tenant routing | routing decision |
//! | `GET  /health` | - | liveness |

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::application::federation_auth_service::FederationAuthService;
use crate::application::message_classifier::{Dispatch, MessageClassifier};
use crate::domain::clock::Clock;
use crate::domain::handshake::HandshakeError;
use crate::domain::message::{BusEnvelope, BusMessage, TELEMETRY};
use crate::domain::routing::DataStoreConnector;
use crate::domain::token::{FederationTokenPayload, TOKEN_CIPHER, TOKEN_EXPIRES_IN_MS};
use crate::infrastructure::federation_router::FederationRouter;
use crate::presentation::error::ApiError;
use crate::presentation::middleware::{require_federation_token, route_tenant, TenantRoute};

pub struct AppState<C: DataStoreConnector> {
    pub auth: Arc<FederationAuthService>,
    pub classifier: Arc<MessageClassifier>,
    pub router: Arc<FederationRouter<C>>,
    pub clock: Arc<dyn Clock>,
    pub start_time: Instant,
}

impl<C: DataStoreConnector> AppState<C> {
    pub fn new(
        auth: Arc<FederationAuthService>,
        classifier: Arc<MessageClassifier>,
        router: Arc<FederationRouter<C>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            auth,
            classifier,
            router,
            clock,
            start_time: Instant::now(),
        }
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

pub fn app<C: DataStoreConnector>(state: Arc<AppState<C>>) -> Router {
    let auth = Router::new()
        .route("/handshake", post(handshake_handler::<C>))
        .route("/assert", post(assert_handler::<C>))
        .route("/verify", post(verify_handler::<C>))
        .route("/node/join", post(node_join_handler::<C>))
        .route("/export", get(export_handler))
        .route("/import", post(import_handler))
        .route("/public-key", get(public_key_handler::<C>));

    let agents = Router::new()
        .route("/telemetry", post(agent_telemetry_handler::<C>))
        .route("/commands", post(agent_commands_handler))
        .route("/jobs", post(agent_jobs_handler))
        .route("/status", get(agent_status_handler::<C>))
        .route_layer(from_fn_with_state(state.clone(), require_federation_token::<C>));

    let bus = Router::new()
        .route("/api/federation/bus", post(bus_handler::<C>))
        .route_layer(from_fn_with_state(state.clone(), require_federation_token::<C>));

    let tenant_api = Router::new()
        .route("/route", get(route_decision_handler::<C>))
        .route_layer(from_fn_with_state(state.clone(), route_tenant::<C>));

    Router::new()
        .route("/health", get(health_handler::<C>))
        .route("/federation/nodes", get(list_nodes_handler::<C>))
        .route("/federation/nodes/status", get(nodes_status_handler::<C>))
        .route("/federation/events", get(events_handler::<C>))
        .nest("/api/federation/auth", auth)
        .nest("/api/federation/agents", agents)
        .nest("/federation/api", tenant_api)
        .merge(bus)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Request bodies. Missing fields default to empty so they surface as the
// endpoint's own error code rather than a decode failure.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct HandshakeRequest {
    node_id: String,
    tenant_id: String,
    fingerprint: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AssertRequest {
    node_id: String,
    signature: String,
    fingerprint: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VerifyRequest {
    federation_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NodeJoinRequest {
    federation: Option<JoinFederation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JoinFederation {
    token: String,
    region: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ExportQuery {
    federation_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImportRequest {
    token: String,
}

async fn health_handler<C: DataStoreConnector>(State(state): State<Arc<AppState<C>>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "uptimeSeconds": state.start_time.elapsed().as_secs(),
    }))
}

async fn handshake_handler<C: DataStoreConnector>(
    State(state): State<Arc<AppState<C>>>,
    body: Result<Json<HandshakeRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body?;
    let grant = state
        .auth
        .begin_handshake(&req.node_id, &req.tenant_id, &req.fingerprint)?;

    Ok(Json(json!({
        "challenge": grant.challenge,
        "nonce": grant.nonce,
        "algo": grant.algorithm,
        "expiresIn": grant.expires_in_ms,
    })))
}

async fn assert_handler<C: DataStoreConnector>(
    State(state): State<Arc<AppState<C>>>,
    body: Result<Json<AssertRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body?;
    if req.node_id.is_empty() || req.signature.is_empty() || req.fingerprint.is_empty() {
        return Err(HandshakeError::MissingFields.into());
    }

    let grant = state.auth.assert(&req.node_id, &req.fingerprint, &req.signature)?;

    Ok(Json(json!({
        "ok": true,
        "tenantId": grant.tenant_id,
        "nodeId": grant.node_id,
        "federationToken": grant.federation_token,
        "federated": true,
        "cipher": TOKEN_CIPHER,
        "expiresIn": TOKEN_EXPIRES_IN_MS,
    })))
}

async fn verify_handler<C: DataStoreConnector>(
    State(state): State<Arc<AppState<C>>>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body?;
    if req.federation_token.is_empty() {
        return Err(ApiError::NoToken);
    }

    let valid = state.auth.verify_token(&req.federation_token).is_ok();
    Ok(Json(json!({ "valid": valid })))
}

async fn node_join_handler<C: DataStoreConnector>(
    State(state): State<Arc<AppState<C>>>,
    body: Result<Json<NodeJoinRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body?;
    let federation = req
        .federation
        .filter(|f| !f.token.is_empty())
        .ok_or(ApiError::MissingFederation)?;

    let payload = state
        .auth
        .authenticate(&federation.token)
        .map_err(|_| ApiError::InvalidFederation)?;

    tracing::info!(node_id = %payload.node_id, tenant_id = %payload.tenant_id, "Node joined federation");

    Ok(Json(json!({
        "ok": true,
        "nodeJoined": payload.node_id,
        "tenantId": payload.tenant_id,
        "region": federation.region,
    })))
}

async fn export_handler(query: Result<Query<ExportQuery>, QueryRejection>) -> ApiResult {
    let Query(query) = query?;
    if query.federation_token.is_empty() {
        return Err(ApiError::TokenRequired);
    }
    Ok(Json(json!({ "token": query.federation_token })))
}

async fn import_handler(body: Result<Json<ImportRequest>, JsonRejection>) -> ApiResult {
    let Json(req) = body?;
    if req.token.is_empty() {
        return Err(ApiError::TokenRequired);
    }
    // Not validated here; the token is checked wherever it is presented.
    Ok(Json(json!({ "ok": true, "tokenAccepted": true })))
}

async fn public_key_handler<C: DataStoreConnector>(State(state): State<Arc<AppState<C>>>) -> Json<Value> {
    Json(json!({
        "publicKey": state.auth.public_key(),
        "cipher": TOKEN_CIPHER,
    }))
}

async fn agent_telemetry_handler<C: DataStoreConnector>(
    State(state): State<Arc<AppState<C>>>,
    Extension(node): Extension<FederationTokenPayload>,
    body: Bytes,
) -> ApiResult {
    let data: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?
    };

    state
        .classifier
        .route(&node.node_id, BusMessage::decode(TELEMETRY, data));

    Ok(Json(json!({
        "ok": true,
        "nodeId": node.node_id,
        "tenantId": node.tenant_id,
    })))
}

async fn agent_commands_handler(Extension(node): Extension<FederationTokenPayload>) -> Json<Value> {
    // No command queue exists in this layer; commands arrive over the bus.
    Json(json!({
        "ok": true,
        "nodeId": node.node_id,
        "commands": [],
    }))
}

async fn agent_jobs_handler(Extension(node): Extension<FederationTokenPayload>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "nodeId": node.node_id,
        "jobs": [],
    }))
}

async fn agent_status_handler<C: DataStoreConnector>(
    State(state): State<Arc<AppState<C>>>,
    Extension(node): Extension<FederationTokenPayload>,
) -> Json<Value> {
    let status = state.classifier.registry().get(&node.node_id);
    Json(json!({
        "ok": true,
        "nodeId": node.node_id,
        "tenantId": node.tenant_id,
        "node": status,
    }))
}

async fn bus_handler<C: DataStoreConnector>(
    State(state): State<Arc<AppState<C>>>,
    Extension(node): Extension<FederationTokenPayload>,
    body: Result<Json<BusEnvelope>, JsonRejection>,
) -> ApiResult {
    let Json(envelope) = body?;
    let kind = envelope.kind.clone();
    let message = BusMessage::from_envelope(envelope);

    let response = match state.classifier.route(&node.node_id, message) {
        Dispatch::Heartbeat => json!({ "ok": true, "status": "alive" }),
        Dispatch::CommandAcknowledged { cmd } => json!({ "ok": true, "accepted": true, "cmd": cmd }),
        Dispatch::Recorded => json!({
            "ok": true,
            "nodeId": node.node_id,
            "tenantId": node.tenant_id,
            "type": kind,
        }),
    };
    Ok(Json(response))
}

async fn list_nodes_handler<C: DataStoreConnector>(State(state): State<Arc<AppState<C>>>) -> Json<Value> {
    Json(json!({ "nodes": state.classifier.registry().list() }))
}

async fn nodes_status_handler<C: DataStoreConnector>(State(state): State<Arc<AppState<C>>>) -> Json<Value> {
    Json(json!({
        "ts": state.clock.now_millis(),
        "nodes": state.classifier.registry().list(),
    }))
}

async fn events_handler<C: DataStoreConnector>(State(state): State<Arc<AppState<C>>>) -> Json<Value> {
    Json(json!({ "events": state.classifier.events().tail() }))
}

async fn route_decision_handler<C: DataStoreConnector>(
    Extension(route): Extension<TenantRoute<C::Connection>>,
) -> Json<Value> {
    Json(json!({
        "tenantId": route.tenant_id,
        "region": route.region,
        "nodeId": route.node_id(),
        "federated": route.is_federated(),
    }))
}
