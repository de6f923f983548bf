// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! HMAC-SHA256 over a handshake challenge, keyed by the node's fingerprint.
//! Signatures travel as lowercase hex.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn keyed(fingerprint: &str, challenge: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(fingerprint.as_bytes()).ok()?;
    mac.update(challenge.as_bytes());
    Some(mac)
}

/// Compute `hex(HMAC-SHA256(key = fingerprint, message = challenge))`.
pub fn sign_challenge(fingerprint: &str, challenge: &str) -> String {
    keyed(fingerprint, challenge)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Constant-time check of a hex signature. Accepts upper or lower case hex.
pub fn verify_challenge(fingerprint: &str, challenge: &str, signature_hex: &str) -> bool {
    let Ok(provided) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    keyed(fingerprint, challenge).is_some_and(|mac| mac.verify_slice(&provided).is_ok())
}
