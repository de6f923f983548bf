// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Federation Auth Service
//!
//! Application service for the node handshake and for admitting federation
//! tokens on later requests.
//!
//! ## Handshake Flow
//!
//! ```text
//! Node
//!   │  begin_handshake { node_id, tenant_id, fingerprint }
//!   ▼
//! HandshakeStore.begin()         → { challenge, nonce, algo, expiresIn }
//!   │
//!   │  node computes hex(HMAC-SHA256(fingerprint, challenge))
//!   │  assert { node_id, fingerprint, signature }
//!   ▼
//! HandshakeStore.assert()        (expiry, fingerprint, HMAC; consumes challenge)
//! TokenCodec.sign()              { nodeId, tenantId, fingerprint, issuedAt }
//! SessionCache.register()
//!   ──────────────────────────────────────────────────────────────
//!   FederationGrant { federation_token }
//! ```
//!
//! ## Admission
//!
//! [`FederationAuthService::authenticate`] checks the session cache first and
//! only verifies the signature on a miss, registering the token once it
//! verifies.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::clock::Clock;
use crate::domain::handshake::{ChallengeGrant, FederationGrant, HandshakeError};
use crate::domain::token::{FederationTokenPayload, TokenError};
use crate::infrastructure::handshake_store::HandshakeStore;
use crate::infrastructure::session_cache::SessionCache;
use crate::infrastructure::token_codec::TokenCodec;

pub struct FederationAuthService {
    handshakes: Arc<HandshakeStore>,
    sessions: Arc<SessionCache>,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
}

impl FederationAuthService {
    pub fn new(
        handshakes: Arc<HandshakeStore>,
        sessions: Arc<SessionCache>,
        codec: TokenCodec,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            handshakes,
            sessions,
            codec,
            clock,
        }
    }

    pub fn begin_handshake(
        &self,
        node_id: &str,
        tenant_id: &str,
        fingerprint: &str,
    ) -> Result<ChallengeGrant, HandshakeError> {
        let grant = self.handshakes.begin(node_id, tenant_id, fingerprint)?;
        metrics::counter!("sage_federation_handshakes_total").increment(1);
        info!(node_id = %node_id, tenant_id = %tenant_id, "Issued federation challenge");
        Ok(grant)
    }

    pub fn assert(
        &self,
        node_id: &str,
        fingerprint: &str,
        signature: &str,
    ) -> Result<FederationGrant, HandshakeError> {
        let challenge = match self.handshakes.assert(node_id, fingerprint, signature) {
            Ok(challenge) => challenge,
            Err(e) => {
                metrics::counter!("sage_federation_assertions_total", "outcome" => assertion_outcome(&e))
                    .increment(1);
                warn!(node_id = %node_id, error = %e, "Federation assertion rejected");
                return Err(e);
            }
        };

        let payload = FederationTokenPayload::new(
            node_id,
            challenge.tenant_id.clone(),
            fingerprint,
            self.clock.now_millis(),
        );
        let federation_token = self.codec.sign(&payload)?;
        self.sessions.register(&federation_token);

        metrics::counter!("sage_federation_assertions_total", "outcome" => "ok").increment(1);
        info!(node_id = %node_id, tenant_id = %challenge.tenant_id, "Node federated");

        Ok(FederationGrant {
            node_id: node_id.to_string(),
            tenant_id: challenge.tenant_id,
            federation_token,
        })
    }

    /// Signature check only; the session cache is neither read nor written.
    pub fn verify_token(&self, token: &str) -> Result<FederationTokenPayload, TokenError> {
        let result = self.codec.verify(token);
        let outcome = if result.is_ok() { "valid" } else { "invalid" };
        metrics::counter!("sage_federation_token_verifications_total", "outcome" => outcome).increment(1);
        result
    }

    /// Admit a presented token: session cache first, then signature.
    pub fn authenticate(&self, token: &str) -> Result<FederationTokenPayload, TokenError> {
        if self.sessions.is_valid(token) {
            if let Ok(payload) = TokenCodec::decode_unverified(token) {
                return Ok(payload);
            }
            // Cached but unparseable; drop it and fall through to full verification
            self.sessions.revoke(token);
        }

        let payload = self.verify_token(token)?;
        self.sessions.register(token);
        debug!(node_id = %payload.node_id, "Registered federation session");
        Ok(payload)
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }

    /// Base64 Ed25519 public key that verifies issued tokens.
    pub fn public_key(&self) -> String {
        self.codec.signer().public_key_base64()
    }

    pub fn handshakes(&self) -> &Arc<HandshakeStore> {
        &self.handshakes
    }

    pub fn sessions(&self) -> &Arc<SessionCache> {
        &self.sessions
    }
}

fn assertion_outcome(error: &HandshakeError) -> &'static str {
    match error {
        HandshakeError::MissingFields => "missing_fields",
        HandshakeError::NoChallengeFound => "no_challenge",
        HandshakeError::ChallengeTimeout => "timeout",
        HandshakeError::FingerprintMismatch => "fingerprint_mismatch",
        HandshakeError::InvalidSignature => "invalid_signature",
        HandshakeError::TokenIssue(_) | HandshakeError::Entropy(_) => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::infrastructure::token_codec::FederationSigner;
    use chrono::Duration;

    fn service() -> (Arc<ManualClock>, FederationAuthService) {
        let clock = Arc::new(ManualClock::starting_now());
        let handshakes = Arc::new(HandshakeStore::new(clock.clone(), Duration::seconds(30)));
        let sessions = Arc::new(SessionCache::new(clock.clone()));
        let codec = TokenCodec::new(Arc::new(FederationSigner::generate()));
        (clock.clone(), FederationAuthService::new(handshakes, sessions, codec, clock))
    }

    #[test]
    fn test_assert_mints_verifiable_token_and_registers_session() {
        let (clock, service) = service();
        let grant = service.begin_handshake("node-7", "tenant-A", "fp-123").unwrap();
        let sig = crate::infrastructure::challenge_mac::sign_challenge("fp-123", &grant.challenge);

        let federated = service.assert("node-7", "fp-123", &sig).unwrap();
        assert_eq!(federated.tenant_id, "tenant-A");
        assert!(service.sessions().is_valid(&federated.federation_token));

        let payload = service.verify_token(&federated.federation_token).unwrap();
        assert_eq!(payload, FederationTokenPayload::new("node-7", "tenant-A", "fp-123", clock.now_millis()));
    }

    #[test]
    fn test_authenticate_registers_on_miss() {
        let (_, service) = service();
        let grant = service.begin_handshake("n", "t", "f").unwrap();
        let sig = crate::infrastructure::challenge_mac::sign_challenge("f", &grant.challenge);
        let token = service.assert("n", "f", &sig).unwrap().federation_token;

        assert!(service.revoke(&token));
        assert!(!service.sessions().is_valid(&token));

        let payload = service.authenticate(&token).unwrap();
        assert_eq!(payload.node_id, "n");
        assert!(service.sessions().is_valid(&token));
    }

    #[test]
    fn test_authenticate_rejects_forgery() {
        let (_, service) = service();
        assert!(matches!(service.authenticate("bogus"), Err(TokenError::MalformedToken(_))));
        assert!(service.sessions().is_empty());
    }
}
