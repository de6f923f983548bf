// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Bounded in-memory log of federation events. Oldest entries fall off the
//! front once capacity is reached. Nothing is persisted.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::clock::Clock;
use crate::domain::events::FederationEvent;
use crate::domain::message::BusMessage;

pub struct EventStream {
    events: RwLock<VecDeque<FederationEvent>>,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl EventStream {
    pub fn new(clock: Arc<dyn Clock>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            clock,
        }
    }

    pub fn append(&self, node_id: &str, message: BusMessage) {
        let event = FederationEvent {
            ts: self.clock.now_millis(),
            kind: message.kind().to_string(),
            node_id: node_id.to_string(),
            data: message,
        };

        let mut events = self.events.write();
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Retained events, oldest first.
    pub fn tail(&self) -> Vec<FederationEvent> {
        self.events.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
