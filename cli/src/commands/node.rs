// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Node-side federation commands
//!
//! Commands: join, heartbeat, status, events
//!
//! `join` runs the full handshake against a gateway (challenge, HMAC answer,
//! token, join) and prints the federation token for later calls.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use sage_federation_core::infrastructure::challenge_mac::sign_challenge;

use crate::daemon::GatewayClient;

#[derive(Subcommand)]
pub enum NodeCommand {
    /// Handshake with the gateway and join the federation
    Join {
        #[arg(long, env = "SAGE_NODE_ID")]
        node_id: String,

        #[arg(long, env = "SAGE_TENANT_ID")]
        tenant_id: String,

        /// Shared fingerprint this node proves knowledge of
        #[arg(long, env = "SAGE_NODE_FINGERPRINT")]
        fingerprint: String,

        /// Region reported at join
        #[arg(long)]
        region: Option<String>,
    },

    /// Send heartbeats over the federation bus
    Heartbeat {
        #[arg(long, env = "SAGE_FEDERATION_TOKEN")]
        token: String,

        /// Repeat every N seconds until interrupted (default: send once)
        #[arg(long, value_name = "SECONDS")]
        every: Option<u64>,
    },

    /// List nodes known to the gateway with their liveness
    Status,

    /// Show the gateway's recent federation events
    Events {
        /// Only show the last N events
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

pub async fn handle_command(command: NodeCommand, client: GatewayClient) -> Result<()> {
    match command {
        NodeCommand::Join {
            node_id,
            tenant_id,
            fingerprint,
            region,
        } => join(&client, &node_id, &tenant_id, &fingerprint, region.as_deref()).await,
        NodeCommand::Heartbeat { token, every } => heartbeat(&client, &token, every).await,
        NodeCommand::Status => status(&client).await,
        NodeCommand::Events { limit } => events(&client, limit).await,
    }
}

/// Run handshake + assert + join and return the issued token.
pub async fn federate(
    client: &GatewayClient,
    node_id: &str,
    tenant_id: &str,
    fingerprint: &str,
    region: Option<&str>,
) -> Result<String> {
    let grant = client.handshake(node_id, tenant_id, fingerprint).await?;
    info!(node_id, expires_in_ms = grant.expires_in, "Received handshake challenge");

    let signature = sign_challenge(fingerprint, &grant.challenge);
    let federated = client.assert(node_id, fingerprint, &signature).await?;

    client.join(&federated.federation_token, region).await?;
    Ok(federated.federation_token)
}

async fn join(
    client: &GatewayClient,
    node_id: &str,
    tenant_id: &str,
    fingerprint: &str,
    region: Option<&str>,
) -> Result<()> {
    let token = federate(client, node_id, tenant_id, fingerprint, region).await?;

    println!(
        "{}",
        format!("✓ {} joined the federation as tenant {}", node_id, tenant_id).green()
    );
    println!();
    println!("Federation token (export as SAGE_FEDERATION_TOKEN):");
    println!("{}", token);

    Ok(())
}

async fn heartbeat(client: &GatewayClient, token: &str, every: Option<u64>) -> Result<()> {
    let Some(period) = every else {
        client.publish(token, "heartbeat", json!({})).await?;
        println!("{}", "✓ Heartbeat accepted".green());
        return Ok(());
    };

    let mut tick = tokio::time::interval(Duration::from_secs(period.max(1)));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                if let Err(e) = client.publish(token, "heartbeat", json!({})).await {
                    warn!("Heartbeat failed: {:#}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping heartbeats");
                return Ok(());
            }
        }
    }
}

async fn status(client: &GatewayClient) -> Result<()> {
    let listing = client.node_status().await?;

    if listing.nodes.is_empty() {
        println!("{}", "No nodes have reported yet.".dimmed());
        return Ok(());
    }

    println!("{:<32} {:<8} {}", "NODE".bold(), "STATUS".bold(), "LAST SEEN".bold());
    for node in listing.nodes {
        let status = if node.is_online() {
            "online".green()
        } else {
            "offline".red()
        };
        let last_seen = Utc
            .timestamp_millis_opt(node.last_seen)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| node.last_seen.to_string());
        println!("{:<32} {:<8} {}", node.node_id, status, last_seen);
    }

    Ok(())
}

async fn events(client: &GatewayClient, limit: Option<usize>) -> Result<()> {
    let events = client.events().await?;
    let skip = limit.map_or(0, |n| events.len().saturating_sub(n));

    for event in events.into_iter().skip(skip) {
        println!(
            "{} {:<10} {:<24} {}",
            event["ts"].as_i64().unwrap_or_default().to_string().dimmed(),
            event["type"].as_str().unwrap_or("?"),
            event["nodeId"].as_str().unwrap_or("?"),
            event["data"]
        );
    }

    Ok(())
}
