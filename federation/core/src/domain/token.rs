// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Federation Token
//!
//! A federation token is a self-contained bearer credential proving a node's
//! `(node_id, tenant_id)` binding. Its wire form is
//! `b64url(payload_json) "." b64url(ed25519_signature)`; nothing about it is
//! stored server-side. The codec lives in
//! [`crate::infrastructure::token_codec`].
//!
//! ## Invariants
//!
//! - A token is valid iff its signature verifies against the current signing
//!   key **and** its payload parses.
//! - Verification never rejects on age. `issued_at` is carried for callers that
//!   want to apply their own policy window.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload signed into every federation token.
///
/// Field order is the serialization order, which keeps the signed bytes
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationTokenPayload {
    pub node_id: String,
    pub tenant_id: String,
    pub fingerprint: String,
    /// Issue time in Unix milliseconds.
    pub issued_at: i64,
}

impl FederationTokenPayload {
    pub fn new(
        node_id: impl Into<String>,
        tenant_id: impl Into<String>,
        fingerprint: impl Into<String>,
        issued_at: i64,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            tenant_id: tenant_id.into(),
            fingerprint: fingerprint.into(),
            issued_at,
        }
    }

    /// Milliseconds elapsed between issue and `now_millis` (never negative).
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        (now_millis - self.issued_at).max(0)
    }
}

/// Advertised lifetime of a token handed out by `assert`, in milliseconds.
///
/// Advisory only: it bounds the session cache entry, not signature validity.
pub const TOKEN_EXPIRES_IN_MS: u64 = 3_600_000;

/// Cipher tag reported to nodes alongside a freshly minted token.
pub const TOKEN_CIPHER: &str = "ed25519";

/// Failures from signing or verifying a federation token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Wrong segment count or a segment that is not valid base64url.
    #[error("malformed federation token: {0}")]
    MalformedToken(String),

    /// The signature did not verify against the current public key.
    #[error("federation token signature is invalid")]
    InvalidSignature,

    /// The signature verified but the payload is not a well-formed payload document.
    #[error("malformed federation token payload: {0}")]
    MalformedPayload(String),

    #[error("failed to serialize federation token payload: {0}")]
    Serialization(String),
}
