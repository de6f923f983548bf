// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Federation Handshake
//!
//! Domain model for the stateless challenge-response ceremony by which a node
//! proves possession of its bootstrap fingerprint and receives a federation
//! token.
//!
//! ## State Machine (per node id)
//!
//! ```text
//! NoChallenge ──begin──▶ Pending ──assert ok──────▶ Asserted ─┐
//!                          │ ▲                                │
//!                          │ └─fingerprint mismatch (kept)    │
//!                          ├──older than 30 s────▶ Expired ───┼─▶ NoChallenge
//!                          └──bad HMAC (kept)                 │
//! ```
//!
//! A node has at most one pending [`Challenge`]. A new `begin` replaces any
//! earlier one. Terminal states are represented by removal from the store.
//!
//! The fingerprint is a pre-shared secret from the tenant bootstrap kit. The
//! node answers with `HMAC-SHA256(key = fingerprint, message = challenge)`,
//! proving it holds the secret without sending the challenge back signed by
//! anything replayable.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::domain::token::TokenError;

/// Algorithm tag returned with every challenge.
pub const HANDSHAKE_ALGORITHM: &str = "HMAC-SHA256";

/// Lifetime of a pending challenge in milliseconds.
pub const CHALLENGE_TTL_MS: i64 = 30_000;

/// Pending challenge for a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub node_id: String,
    pub tenant_id: String,
    pub fingerprint: String,
    /// Public challenge value the node must MAC.
    pub challenge: String,
    pub issued_at: DateTime<Utc>,
}

impl Challenge {
    /// True once strictly more than `ttl` has passed since issue.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.issued_at > ttl
    }
}

/// What `begin` hands back to the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeGrant {
    pub challenge: String,
    /// Second random value returned for client-side binding; never checked server-side.
    pub nonce: String,
    pub algorithm: &'static str,
    pub expires_in_ms: i64,
}

/// Result of a successful assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationGrant {
    pub node_id: String,
    pub tenant_id: String,
    pub federation_token: String,
}

/// Handshake failures. Each is terminal for the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("nodeId, tenantId and fingerprint are all required")]
    MissingFields,

    #[error("no pending challenge for node")]
    NoChallengeFound,

    #[error("challenge expired before assertion")]
    ChallengeTimeout,

    #[error("fingerprint does not match the pending challenge")]
    FingerprintMismatch,

    #[error("challenge signature is invalid")]
    InvalidSignature,

    #[error("failed to issue federation token: {0}")]
    TokenIssue(#[from] TokenError),

    #[error("failed to gather randomness: {0}")]
    Entropy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge_at(issued_at: DateTime<Utc>) -> Challenge {
        Challenge {
            node_id: "node-1".into(),
            tenant_id: "tenant-1".into(),
            fingerprint: "fp".into(),
            challenge: "c".into(),
            issued_at,
        }
    }

    #[test]
    fn test_expiry_is_strictly_after_ttl() {
        let start = Utc::now();
        let challenge = challenge_at(start);
        let ttl = Duration::milliseconds(CHALLENGE_TTL_MS);

        assert!(!challenge.is_expired(start + ttl, ttl));
        assert!(challenge.is_expired(start + ttl + Duration::milliseconds(1), ttl));
    }
}
