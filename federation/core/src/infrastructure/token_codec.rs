// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Federation Token Codec
//!
//! Signs and verifies [`FederationTokenPayload`]s with an Ed25519 key.
//!
//! ```text
//! payload ──serde_json──▶ bytes ──ed25519 sign──▶ sig
//!                           │                      │
//!                       b64url                 b64url
//!                           └────────── "." ───────┘
//! ```
//!
//! The signing key is owned by a [`FederationSigner`] that the composition
//! root constructs once and hands to [`TokenCodec`] by `Arc`.

use std::sync::Arc;

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;

use crate::domain::token::{FederationTokenPayload, TokenError};

const SEGMENT_SEPARATOR: char = '.';

/// Process signing identity for federation tokens.
pub struct FederationSigner {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl FederationSigner {
    /// Fresh keypair from the OS RNG. Tokens it signs die with the process.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    /// Deterministic keypair from a standard-base64 32-byte seed.
    pub fn from_seed_base64(seed: &str) -> anyhow::Result<Self> {
        let bytes = STANDARD
            .decode(seed.trim())
            .map_err(|e| anyhow::anyhow!("Invalid base64 signing seed: {}", e))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Signing seed must be 32 bytes"))?;
        Ok(Self::from_signing_key(SigningKey::from_bytes(&seed)))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self { signing_key, verifying_key }
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Seed in the form accepted by [`FederationSigner::from_seed_base64`].
    pub fn seed_base64(&self) -> String {
        STANDARD.encode(self.signing_key.to_bytes())
    }

    /// Public key in standard base64, for distribution to nodes.
    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.verifying_key.as_bytes())
    }

    fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

impl std::fmt::Debug for FederationSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederationSigner")
            .field("public_key", &self.public_key_base64())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct TokenCodec {
    signer: Arc<FederationSigner>,
}

impl TokenCodec {
    pub fn new(signer: Arc<FederationSigner>) -> Self {
        Self { signer }
    }

    pub fn signer(&self) -> &FederationSigner {
        &self.signer
    }

    /// Serialize, sign and encode a payload.
    pub fn sign(&self, payload: &FederationTokenPayload) -> Result<String, TokenError> {
        let bytes = serde_json::to_vec(payload).map_err(|e| TokenError::Serialization(e.to_string()))?;
        let signature = self.signer.sign(&bytes);

        Ok(format!(
            "{}{}{}",
            URL_SAFE_NO_PAD.encode(&bytes),
            SEGMENT_SEPARATOR,
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    /// Check a token's signature and return its payload.
    ///
    /// The payload is only parsed after the signature verifies. Age is not checked.
    pub fn verify(&self, token: &str) -> Result<FederationTokenPayload, TokenError> {
        let (payload_bytes, signature_bytes) = split_token(token)?;

        let signature_bytes: [u8; 64] = signature_bytes
            .try_into()
            .map_err(|_| TokenError::InvalidSignature)?;
        let signature = Signature::from_bytes(&signature_bytes);

        self.signer
            .verifying_key()
            .verify(&payload_bytes, &signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        serde_json::from_slice(&payload_bytes).map_err(|e| TokenError::MalformedPayload(e.to_string()))
    }

    /// Parse a token's payload without checking its signature.
    ///
    /// Only for tokens already known to be valid (the session fast path) or
    /// for display.
    pub fn decode_unverified(token: &str) -> Result<FederationTokenPayload, TokenError> {
        let (payload_bytes, _) = split_token(token)?;
        serde_json::from_slice(&payload_bytes).map_err(|e| TokenError::MalformedPayload(e.to_string()))
    }
}

fn split_token(token: &str) -> Result<(Vec<u8>, Vec<u8>), TokenError> {
    let segments: Vec<&str> = token.split(SEGMENT_SEPARATOR).collect();
    if segments.len() != 2 {
        return Err(TokenError::MalformedToken(format!(
            "expected 2 segments, found {}",
            segments.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[0])
        .map_err(|e| TokenError::MalformedToken(format!("payload segment: {}", e)))?;
    let signature = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|e| TokenError::MalformedToken(format!("signature segment: {}", e)))?;

    Ok((payload, signature))
}
