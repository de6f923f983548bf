// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use sage_federation_core::domain::clock::Clock;
use sage_federation_core::infrastructure::challenge_mac::sign_challenge;
use sage_federation_core::presentation::app;

use common::TestGateway;

fn router(gw: &TestGateway) -> Router {
    app(gw.state.clone())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_token(mut request: Request<Body>, token: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert("x-federation-token", token.parse().unwrap());
    request
}

/// Run handshake + assert over HTTP and return the federation token.
async fn federate(gw: &TestGateway, node: &str, tenant: &str, fingerprint: &str) -> String {
    let (status, body) = send(
        router(gw),
        post_json(
            "/api/federation/auth/handshake",
            json!({"nodeId": node, "tenantId": tenant, "fingerprint": fingerprint}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let challenge = body["challenge"].as_str().unwrap();
    let (status, body) = send(
        router(gw),
        post_json(
            "/api/federation/auth/assert",
            json!({"nodeId": node, "fingerprint": fingerprint, "signature": sign_challenge(fingerprint, challenge)}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["federationToken"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_handshake_response_shape() {
    let gw = TestGateway::new();
    let (status, body) = send(
        router(&gw),
        post_json(
            "/api/federation/auth/handshake",
            json!({"nodeId": "node-7", "tenantId": "tenant-A", "fingerprint": "fp-123"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["algo"], "HMAC-SHA256");
    assert_eq!(body["expiresIn"], 30_000);
    assert!(body["challenge"].is_string());
    assert!(body["nonce"].is_string());
}

#[tokio::test]
async fn test_handshake_missing_fields() {
    let gw = TestGateway::new();
    let (status, body) = send(
        router(&gw),
        post_json("/api/federation/auth/handshake", json!({"nodeId": "node-7"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "MISSING_FIELDS"}));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let gw = TestGateway::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/federation/auth/assert")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(router(&gw), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_assert_success_and_replay() {
    let gw = TestGateway::new();
    let (_, hs) = send(
        router(&gw),
        post_json(
            "/api/federation/auth/handshake",
            json!({"nodeId": "node-7", "tenantId": "tenant-A", "fingerprint": "fp-123"}),
        ),
    )
    .await;
    let signature = sign_challenge("fp-123", hs["challenge"].as_str().unwrap());
    let assert_body = json!({"nodeId": "node-7", "fingerprint": "fp-123", "signature": signature});

    let (status, body) = send(router(&gw), post_json("/api/federation/auth/assert", assert_body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["tenantId"], "tenant-A");
    assert_eq!(body["nodeId"], "node-7");
    assert_eq!(body["federated"], true);
    assert_eq!(body["cipher"], "ed25519");
    assert_eq!(body["expiresIn"], 3_600_000);

    let token = body["federationToken"].as_str().unwrap();
    let (status, verify) = send(
        router(&gw),
        post_json("/api/federation/auth/verify", json!({"federationToken": token})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verify, json!({"valid": true}));

    let (status, body) = send(router(&gw), post_json("/api/federation/auth/assert", assert_body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": "NO_CHALLENGE_FOUND"}));
}

#[tokio::test]
async fn test_assert_rejections() {
    let gw = TestGateway::new();
    let (_, hs) = send(
        router(&gw),
        post_json(
            "/api/federation/auth/handshake",
            json!({"nodeId": "n", "tenantId": "t", "fingerprint": "fp"}),
        ),
    )
    .await;
    let challenge = hs["challenge"].as_str().unwrap().to_string();

    let (status, body) = send(
        router(&gw),
        post_json(
            "/api/federation/auth/assert",
            json!({"nodeId": "n", "fingerprint": "other", "signature": sign_challenge("other", &challenge)}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FINGERPRINT_MISMATCH");

    let (status, body) = send(
        router(&gw),
        post_json(
            "/api/federation/auth/assert",
            json!({"nodeId": "n", "fingerprint": "fp", "signature": "00ff"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "INVALID_SIGNATURE");

    gw.clock.advance_millis(30_001);
    let (status, body) = send(
        router(&gw),
        post_json(
            "/api/federation/auth/assert",
            json!({"nodeId": "n", "fingerprint": "fp", "signature": sign_challenge("fp", &challenge)}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "CHALLENGE_TIMEOUT");
}

#[tokio::test]
async fn test_verify_codes() {
    let gw = TestGateway::new();
    let (status, body) = send(router(&gw), post_json("/api/federation/auth/verify", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NO_TOKEN");

    let (status, body) = send(
        router(&gw),
        post_json("/api/federation/auth/verify", json!({"federationToken": "abc.def"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"valid": false}));
}

#[tokio::test]
async fn test_node_join() {
    let gw = TestGateway::new();
    let token = federate(&gw, "pi-1", "tenant-A", "fp").await;
    gw.auth().revoke(&token);

    let (status, body) = send(
        router(&gw),
        post_json("/api/federation/auth/node/join", json!({"federation": {"token": token, "region": "eu"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["nodeJoined"], "pi-1");
    assert_eq!(body["tenantId"], "tenant-A");
    assert_eq!(body["region"], "eu");
    assert!(gw.auth().sessions().is_valid(&token));

    let (status, body) = send(router(&gw), post_json("/api/federation/auth/node/join", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MISSING_FEDERATION");

    let (status, body) = send(
        router(&gw),
        post_json("/api/federation/auth/node/join", json!({"federation": {"token": "forged.token"}})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "INVALID_FEDERATION");
}

#[tokio::test]
async fn test_export_import() {
    let gw = TestGateway::new();
    let (status, body) = send(router(&gw), get("/api/federation/auth/export?federationToken=abc.def")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"token": "abc.def"}));

    let (status, body) = send(router(&gw), get("/api/federation/auth/export")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "TOKEN_REQUIRED");

    let (status, body) = send(router(&gw), post_json("/api/federation/auth/import", json!({"token": "x.y"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "tokenAccepted": true}));

    let (status, body) = send(router(&gw), post_json("/api/federation/auth/import", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "TOKEN_REQUIRED");
}

#[tokio::test]
async fn test_public_key_matches_signer() {
    let gw = TestGateway::new();
    let (status, body) = send(router(&gw), get("/api/federation/auth/public-key")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publicKey"], gw.auth().public_key());
    assert_eq!(body["cipher"], "ed25519");
}

#[tokio::test]
async fn test_agent_routes_require_token() {
    let gw = TestGateway::new();
    let (status, body) = send(router(&gw), get("/api/federation/agents/status")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "MISSING_FEDERATION_TOKEN");

    let (status, body) = send(router(&gw), with_token(get("/api/federation/agents/status"), "nope")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "INVALID_FEDERATION_TOKEN");
}

#[tokio::test]
async fn test_agent_endpoints() {
    let gw = TestGateway::new();
    let token = federate(&gw, "agent-1", "tenant-A", "fp").await;

    let (status, body) = send(
        router(&gw),
        with_token(post_json("/api/federation/agents/telemetry", json!({"metrics": {"cpu": 0.4}})), &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "nodeId": "agent-1", "tenantId": "tenant-A"}));
    assert_eq!(gw.state.classifier.events().tail()[0].kind, "telemetry");

    let (_, body) = send(
        router(&gw),
        with_token(post_json("/api/federation/agents/commands", json!({})), &token),
    )
    .await;
    assert_eq!(body, json!({"ok": true, "nodeId": "agent-1", "commands": []}));

    let (_, body) = send(
        router(&gw),
        with_token(post_json("/api/federation/agents/jobs", json!({})), &token),
    )
    .await;
    assert_eq!(body, json!({"ok": true, "nodeId": "agent-1", "jobs": []}));

    let (_, body) = send(router(&gw), with_token(get("/api/federation/agents/status"), &token)).await;
    assert_eq!(body["nodeId"], "agent-1");
    assert_eq!(body["tenantId"], "tenant-A");
    assert!(body["node"].is_null());
}

#[tokio::test]
async fn test_token_is_admitted_after_session_eviction() {
    let gw = TestGateway::new();
    let token = federate(&gw, "agent-1", "tenant-A", "fp").await;
    gw.clock.advance_millis(1);
    gw.auth().sessions().sweep_expired(chrono::Duration::zero());
    assert!(!gw.auth().sessions().is_valid(&token));

    let (status, _) = send(router(&gw), with_token(get("/api/federation/agents/status"), &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(gw.auth().sessions().is_valid(&token));
}

#[tokio::test]
async fn test_bus_dispatch_and_presence_views() {
    let gw = TestGateway::new();
    let token = federate(&gw, "node-1", "tenant-A", "fp").await;

    let (status, body) = send(
        router(&gw),
        with_token(post_json("/api/federation/bus", json!({"type": "heartbeat", "data": {"uptimeSeconds": 5}})), &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "status": "alive"}));

    let (_, body) = send(
        router(&gw),
        with_token(post_json("/api/federation/bus", json!({"type": "command", "data": {"cmd": "reboot"}})), &token),
    )
    .await;
    assert_eq!(body, json!({"ok": true, "accepted": true, "cmd": "reboot"}));

    let (_, body) = send(
        router(&gw),
        with_token(post_json("/api/federation/bus", json!({"type": "firmware", "data": {"v": 2}})), &token),
    )
    .await;
    assert_eq!(body, json!({"ok": true, "nodeId": "node-1", "tenantId": "tenant-A", "type": "firmware"}));

    let (_, body) = send(router(&gw), get("/federation/nodes")).await;
    assert_eq!(body["nodes"][0]["nodeId"], "node-1");
    assert_eq!(body["nodes"][0]["status"], "online");

    gw.clock.advance_millis(45_001);
    let (_, body) = send(router(&gw), get("/federation/nodes/status")).await;
    assert_eq!(body["ts"], gw.clock.now_millis());
    assert_eq!(body["nodes"][0]["status"], "offline");

    let (_, body) = send(router(&gw), get("/federation/events")).await;
    let kinds: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["heartbeat", "command", "firmware"]);
}

#[tokio::test]
async fn test_bus_requires_token() {
    let gw = TestGateway::new();
    let (status, body) = send(router(&gw), post_json("/api/federation/bus", json!({"type": "heartbeat"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "MISSING_FEDERATION_TOKEN");
}

#[tokio::test]
async fn test_tenant_routing_decisions() {
    let gw = TestGateway::new();
    gw.map_tenant("tenant-A", "eu-1", "eu");
    gw.add_route("tenant-A", "us", "us-1", 5);

    let (status, body) = send(router(&gw), get("/federation/api/route?tenantId=tenant-A")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodeId"], "eu-1");
    assert_eq!(body["federated"], true);

    let request = Request::builder()
        .uri("/federation/api/route")
        .header("x-tenant-id", "tenant-A")
        .header("x-region", "us")
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(router(&gw), request).await;
    assert_eq!(body["nodeId"], "us-1");
    assert_eq!(body["region"], "us");

    let (_, body) = send(router(&gw), get("/federation/api/route?tenantId=tenant-X")).await;
    assert_eq!(body["nodeId"], "default");
    assert_eq!(body["federated"], false);

    let (_, body) = send(router(&gw), get("/federation/api/route")).await;
    assert_eq!(body["nodeId"], "default");
    assert!(body["tenantId"].is_null());
}

#[tokio::test]
async fn test_repeated_query_keys_never_block_routing() {
    let gw = TestGateway::new();
    gw.map_tenant("tenant-A", "eu-1", "eu");

    let (status, body) = send(router(&gw), get("/federation/api/route?tenantId=a&tenantId=b")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodeId"], "default");
    assert_eq!(body["tenantId"], "a");

    let (status, body) = send(
        router(&gw),
        get("/federation/api/route?tenantId=&tenantId=tenant-A&region=eu&region=us"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodeId"], "eu-1");

    let (status, body) = send(
        router(&gw),
        get("/api/federation/auth/export?federationToken=a&federationToken=b"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "INVALID_REQUEST"}));
}

#[tokio::test]
async fn test_health() {
    let gw = TestGateway::new();
    let (status, body) = send(router(&gw), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["uptimeSeconds"].is_u64());
}
