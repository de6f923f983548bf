// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Admission cache of federation tokens that have verified at least once.
//!
//! A miss says nothing about validity: callers fall back to
//! [`TokenCodec::verify`](crate::infrastructure::token_codec::TokenCodec::verify)
//! and register the token on success. Entries age out via [`SessionCache::sweep_expired`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::domain::clock::Clock;

pub struct SessionCache {
    // token -> time of registration
    sessions: RwLock<HashMap<String, DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl SessionCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn register(&self, token: &str) {
        let now = self.clock.now();
        self.sessions.write().insert(token.to_string(), now);
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.sessions.read().contains_key(token)
    }

    /// Remove a token. Returns whether it was present.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }

    /// Drop entries registered more than `ttl` ago.
    pub fn sweep_expired(&self, ttl: Duration) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, registered_at| now - *registered_at <= ttl);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;

    #[test]
    fn test_register_revoke() {
        let cache = SessionCache::new(Arc::new(ManualClock::starting_now()));
        assert!(!cache.is_valid("tok"));
        cache.register("tok");
        assert!(cache.is_valid("tok"));
        assert!(cache.revoke("tok"));
        assert!(!cache.revoke("tok"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_expired() {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = SessionCache::new(clock.clone());
        cache.register("old");
        clock.advance(Duration::minutes(30));
        cache.register("new");
        clock.advance(Duration::minutes(31));

        assert_eq!(cache.sweep_expired(Duration::hours(1)), 1);
        assert!(!cache.is_valid("old"));
        assert!(cache.is_valid("new"));
    }

    #[test]
    fn test_reregister_refreshes_age() {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = SessionCache::new(clock.clone());
        cache.register("tok");
        clock.advance(Duration::minutes(50));
        cache.register("tok");
        clock.advance(Duration::minutes(50));
        assert_eq!(cache.sweep_expired(Duration::hours(1)), 0);
        assert_eq!(cache.len(), 1);
    }
}
