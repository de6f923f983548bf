// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Handshake Store
//!
//! Pending challenges keyed by node id, at most one per node.
//!
//! `assert` runs its checks and the removal under one write lock, so of two
//! concurrent asserts for the same challenge exactly one can succeed; the
//! other observes `NoChallengeFound`.
//!
//! | Outcome | Entry afterwards |
//! |---------|------------------|
//! | no entry | - |
//! | older than TTL | removed |
//! | fingerprint mismatch | kept |
//! | bad HMAC | kept |
//! | success | removed |

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use parking_lot::RwLock;
use rand_core::{OsRng, RngCore};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::domain::clock::Clock;
use crate::domain::handshake::{Challenge, ChallengeGrant, HandshakeError, HANDSHAKE_ALGORITHM};
use crate::infrastructure::challenge_mac;

const NONCE_BYTES: usize = 32;

pub struct HandshakeStore {
    pending: RwLock<HashMap<String, Challenge>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl HandshakeStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            pending: RwLock::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    /// Issue a challenge for `node_id`, replacing any pending one.
    pub fn begin(
        &self,
        node_id: &str,
        tenant_id: &str,
        fingerprint: &str,
    ) -> Result<ChallengeGrant, HandshakeError> {
        if node_id.is_empty() || tenant_id.is_empty() || fingerprint.is_empty() {
            return Err(HandshakeError::MissingFields);
        }

        let challenge = random_hex()?;
        let nonce = random_hex()?;

        let entry = Challenge {
            node_id: node_id.to_string(),
            tenant_id: tenant_id.to_string(),
            fingerprint: fingerprint.to_string(),
            challenge: challenge.clone(),
            issued_at: self.clock.now(),
        };

        let replaced = self.pending.write().insert(node_id.to_string(), entry).is_some();
        if replaced {
            debug!(node_id = %node_id, "Replaced pending federation challenge");
        }

        Ok(ChallengeGrant {
            challenge,
            nonce,
            algorithm: HANDSHAKE_ALGORITHM,
            expires_in_ms: self.ttl.num_milliseconds(),
        })
    }

    /// Check a node's answer and consume the challenge on success.
    pub fn assert(
        &self,
        node_id: &str,
        fingerprint: &str,
        signature: &str,
    ) -> Result<Challenge, HandshakeError> {
        let mut pending = self.pending.write();

        let entry = pending.get(node_id).ok_or(HandshakeError::NoChallengeFound)?;

        if entry.is_expired(self.clock.now(), self.ttl) {
            pending.remove(node_id);
            return Err(HandshakeError::ChallengeTimeout);
        }

        let fingerprint_matches: bool = entry.fingerprint.as_bytes().ct_eq(fingerprint.as_bytes()).into();
        if !fingerprint_matches {
            return Err(HandshakeError::FingerprintMismatch);
        }

        if !challenge_mac::verify_challenge(&entry.fingerprint, &entry.challenge, signature) {
            return Err(HandshakeError::InvalidSignature);
        }

        pending.remove(node_id).ok_or(HandshakeError::NoChallengeFound)
    }

    /// Drop every challenge older than the TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut pending = self.pending.write();
        let before = pending.len();
        pending.retain(|_, c| !c.is_expired(now, self.ttl));
        before - pending.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.read().len()
    }

    /// The current challenge value for a node, if one is pending.
    pub fn pending_challenge(&self, node_id: &str) -> Option<String> {
        self.pending.read().get(node_id).map(|c| c.challenge.clone())
    }
}

fn random_hex() -> Result<String, HandshakeError> {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| HandshakeError::Entropy(e.to_string()))?;
    Ok(hex::encode(bytes))
}
