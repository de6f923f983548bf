// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Records every bus message in the event stream, then dispatches it by type.
//! Commands are acknowledged here and never executed.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::message::BusMessage;
use crate::infrastructure::event_stream::EventStream;
use crate::infrastructure::node_registry::NodeRegistry;

/// What the classifier did with a message beyond recording it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Node registry heartbeat updated.
    Heartbeat,
    /// Command accepted for downstream consumers of the event stream.
    CommandAcknowledged { cmd: String },
    /// Recorded only.
    Recorded,
}

pub struct MessageClassifier {
    registry: Arc<NodeRegistry>,
    events: Arc<EventStream>,
}

impl MessageClassifier {
    pub fn new(registry: Arc<NodeRegistry>, events: Arc<EventStream>) -> Self {
        Self { registry, events }
    }

    pub fn route(&self, node_id: &str, message: BusMessage) -> Dispatch {
        metrics::counter!("sage_federation_bus_messages_total", "type" => metric_label(&message))
            .increment(1);

        // Recorded before dispatch; not transactional with the registry update
        self.events.append(node_id, message.clone());

        match &message {
            BusMessage::Heartbeat(_) => {
                self.registry.heartbeat(node_id);
                Dispatch::Heartbeat
            }
            BusMessage::Command(command) => {
                info!(node_id = %node_id, cmd = %command.cmd, "Federation command acknowledged");
                Dispatch::CommandAcknowledged { cmd: command.cmd.clone() }
            }
            BusMessage::Telemetry(_) | BusMessage::Event(_) => Dispatch::Recorded,
            BusMessage::Opaque { kind, .. } => {
                debug!(node_id = %node_id, kind = %kind, "Recorded unclassified federation message");
                Dispatch::Recorded
            }
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventStream> {
        &self.events
    }
}

// Bounded label set: arbitrary opaque kinds collapse to one series.
fn metric_label(message: &BusMessage) -> &'static str {
    use crate::domain::message::{COMMAND, EVENT, HEARTBEAT, TELEMETRY};
    match message {
        BusMessage::Heartbeat(_) => HEARTBEAT,
        BusMessage::Telemetry(_) => TELEMETRY,
        BusMessage::Event(_) => EVENT,
        BusMessage::Command(_) => COMMAND,
        BusMessage::Opaque { .. } => "opaque",
    }
}
