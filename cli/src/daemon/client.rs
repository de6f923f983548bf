// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for a running federation gateway

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use sage_federation_core::domain::node::NodeStatus;

const FEDERATION_TOKEN_HEADER: &str = "x-federation-token";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeResponse {
    pub challenge: String,
    pub nonce: String,
    pub algo: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertResponse {
    pub tenant_id: String,
    pub node_id: String,
    pub federation_token: String,
    pub cipher: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub node_joined: String,
    pub tenant_id: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodesResponse {
    pub ts: Option<i64>,
    pub nodes: Vec<NodeStatus>,
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Client for `host:port`, defaulting the scheme to http.
    pub fn for_host(host: &str, port: u16) -> Result<Self> {
        if host.starts_with("http://") || host.starts_with("https://") {
            Self::new(format!("{}:{}", host, port))
        } else {
            Self::new(format!("http://{}:{}", host, port))
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("Failed to reach gateway")?;

        parse(response, "health check").await
    }

    pub async fn handshake(
        &self,
        node_id: &str,
        tenant_id: &str,
        fingerprint: &str,
    ) -> Result<HandshakeResponse> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct HandshakeRequest<'a> {
            node_id: &'a str,
            tenant_id: &'a str,
            fingerprint: &'a str,
        }

        let response = self
            .client
            .post(format!("{}/api/federation/auth/handshake", self.base_url))
            .json(&HandshakeRequest {
                node_id,
                tenant_id,
                fingerprint,
            })
            .send()
            .await
            .context("Failed to request handshake challenge")?;

        parse(response, "handshake").await
    }

    pub async fn assert(
        &self,
        node_id: &str,
        fingerprint: &str,
        signature: &str,
    ) -> Result<AssertResponse> {
        let response = self
            .client
            .post(format!("{}/api/federation/auth/assert", self.base_url))
            .json(&json!({
                "nodeId": node_id,
                "fingerprint": fingerprint,
                "signature": signature,
            }))
            .send()
            .await
            .context("Failed to submit handshake assertion")?;

        parse(response, "assert").await
    }

    pub async fn verify(&self, token: &str) -> Result<bool> {
        let response = self
            .client
            .post(format!("{}/api/federation/auth/verify", self.base_url))
            .json(&json!({ "federationToken": token }))
            .send()
            .await
            .context("Failed to verify token")?;

        let body: Value = parse(response, "verify").await?;
        Ok(body["valid"].as_bool().unwrap_or(false))
    }

    pub async fn join(&self, token: &str, region: Option<&str>) -> Result<JoinResponse> {
        let response = self
            .client
            .post(format!("{}/api/federation/auth/node/join", self.base_url))
            .json(&json!({ "federation": { "token": token, "region": region } }))
            .send()
            .await
            .context("Failed to join federation")?;

        parse(response, "node join").await
    }

    pub async fn public_key(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/api/federation/auth/public-key", self.base_url))
            .send()
            .await
            .context("Failed to fetch gateway public key")?;

        let body: Value = parse(response, "public key").await?;
        body["publicKey"]
            .as_str()
            .map(str::to_string)
            .context("Gateway response carried no publicKey")
    }

    /// Post a typed message to the federation bus.
    pub async fn publish(&self, token: &str, kind: &str, data: Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/api/federation/bus", self.base_url))
            .header(FEDERATION_TOKEN_HEADER, token)
            .json(&json!({ "type": kind, "data": data }))
            .send()
            .await
            .context("Failed to publish bus message")?;

        parse(response, "bus publish").await
    }

    pub async fn node_status(&self) -> Result<NodesResponse> {
        let response = self
            .client
            .get(format!("{}/federation/nodes/status", self.base_url))
            .send()
            .await
            .context("Failed to list federation nodes")?;

        parse(response, "node status").await
    }

    pub async fn events(&self) -> Result<Vec<Value>> {
        #[derive(Deserialize)]
        struct EventsResponse {
            events: Vec<Value>,
        }

        let response = self
            .client
            .get(format!("{}/federation/events", self.base_url))
            .send()
            .await
            .context("Failed to fetch federation events")?;

        let body: EventsResponse = parse(response, "events").await?;
        Ok(body.events)
    }
}

async fn parse<T: serde::de::DeserializeOwned>(response: Response, operation: &str) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Gateway rejected {} ({}): {}", operation, status, error_text);
    }

    response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", operation))
}
