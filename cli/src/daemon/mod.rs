// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Gateway process support
//!
//! Handles:
//! - The gateway HTTP server (composition root)
//! - HTTP client for a running gateway
//! - Health probing

use anyhow::Result;
use std::time::Duration;

pub mod client;
pub mod server;

pub use client::GatewayClient;
pub use server::start_gateway;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    Running { uptime: u64 },
    Stopped,
    Unhealthy { error: String },
}

/// Probe a gateway's `/health` endpoint with a short timeout.
pub async fn check_gateway_running(base_url: &str) -> Result<GatewayStatus> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .build()?;

    let health_url = format!("{}/health", base_url.trim_end_matches('/'));

    match client.get(&health_url).send().await {
        Ok(resp) if resp.status().is_success() => {
            let uptime = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v["uptimeSeconds"].as_u64())
                .unwrap_or(0);
            Ok(GatewayStatus::Running { uptime })
        }
        Ok(resp) => Ok(GatewayStatus::Unhealthy {
            error: format!("HTTP {}", resp.status()),
        }),
        // Connection refused or timed out
        Err(_) => Ok(GatewayStatus::Stopped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_running_gateway_reports_uptime() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status":"healthy","uptimeSeconds":42}"#)
            .create_async()
            .await;

        let status = check_gateway_running(&server.url()).await.unwrap();
        assert_eq!(status, GatewayStatus::Running { uptime: 42 });
    }

    #[tokio::test]
    async fn test_error_status_is_unhealthy() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(503)
            .create_async()
            .await;

        let status = check_gateway_running(&server.url()).await.unwrap();
        assert!(matches!(status, GatewayStatus::Unhealthy { .. }));
    }

    #[tokio::test]
    async fn test_nothing_listening_is_stopped() {
        // Port 9 (discard) is not served in test environments
        let status = check_gateway_running("http://127.0.0.1:9").await.unwrap();
        assert_eq!(status, GatewayStatus::Stopped);
    }
}
