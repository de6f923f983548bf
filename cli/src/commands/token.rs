// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Federation token and signing key utilities
//!
//! Commands: inspect, verify, keygen

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use sage_federation_core::domain::token::{FederationTokenPayload, TOKEN_EXPIRES_IN_MS};
use sage_federation_core::infrastructure::{FederationSigner, TokenCodec};

use crate::daemon::GatewayClient;

#[derive(Subcommand)]
pub enum TokenCommand {
    /// Decode a token's payload without checking its signature
    Inspect {
        #[arg(env = "SAGE_FEDERATION_TOKEN")]
        token: String,
    },

    /// Ask the gateway whether a token's signature is valid
    Verify {
        #[arg(env = "SAGE_FEDERATION_TOKEN")]
        token: String,
    },

    /// Generate a signing seed for `spec.signing.seed`
    Keygen,
}

pub async fn handle_command(command: TokenCommand, client: GatewayClient) -> Result<()> {
    match command {
        TokenCommand::Inspect { token } => inspect(&token),
        TokenCommand::Verify { token } => verify(&client, &token).await,
        TokenCommand::Keygen => keygen(),
    }
}

fn inspect(token: &str) -> Result<()> {
    let payload = TokenCodec::decode_unverified(token).context("Failed to decode federation token")?;
    let now = chrono::Utc::now().timestamp_millis();

    println!("{}", "Federation token (signature NOT checked):".bold());
    for line in describe(&payload, now) {
        println!("  {}", line);
    }

    Ok(())
}

/// Human-readable payload lines. The advertised lifetime is informational.
fn describe(payload: &FederationTokenPayload, now_ms: i64) -> Vec<String> {
    let age_secs = payload.age_millis(now_ms) / 1000;
    let advertised = if payload.age_millis(now_ms) > TOKEN_EXPIRES_IN_MS as i64 {
        "past advertised lifetime (still accepted by the gateway)"
    } else {
        "within advertised lifetime"
    };

    vec![
        format!("Node: {}", payload.node_id),
        format!("Tenant: {}", payload.tenant_id),
        format!("Fingerprint: {}", payload.fingerprint),
        format!("Issued: {} ({} s ago, {})", payload.issued_at, age_secs, advertised),
    ]
}

async fn verify(client: &GatewayClient, token: &str) -> Result<()> {
    if client.verify(token).await? {
        println!("{}", "✓ Token signature is valid".green());
        Ok(())
    } else {
        anyhow::bail!("Token was rejected by {}", client.base_url())
    }
}

fn keygen() -> Result<()> {
    let signer = FederationSigner::generate();

    println!("{}", "Add to the gateway configuration:".bold());
    println!();
    println!("spec:");
    println!("  signing:");
    println!("    seed: \"{}\"", signer.seed_base64());
    println!();
    println!("Public key: {}", signer.public_key_base64());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_inspect_reads_signed_token() {
        let codec = TokenCodec::new(Arc::new(FederationSigner::generate()));
        let token = codec
            .sign(&FederationTokenPayload::new("node-7", "tenant-A", "fp-123", 1_000))
            .unwrap();

        inspect(&token).unwrap();
        assert!(inspect("not-a-token").is_err());
    }

    #[test]
    fn test_describe_flags_old_tokens() {
        let payload = FederationTokenPayload::new("node-7", "tenant-A", "fp-123", 0);

        let fresh = describe(&payload, 1_000);
        assert_eq!(fresh[0], "Node: node-7");
        assert!(fresh[3].contains("within advertised lifetime"));

        let old = describe(&payload, TOKEN_EXPIRES_IN_MS as i64 + 1);
        assert!(old[3].contains("past advertised lifetime"));
    }
}
