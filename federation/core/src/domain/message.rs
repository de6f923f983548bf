// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Federation Bus Messages
//!
//! A node that holds a federation token posts typed envelopes
//! `{ "type": ..., "data": ... }` to the bus. The `type` tag selects one of a
//! closed set of payloads; anything else is kept as [`BusMessage::Opaque`] so it
//! is still recorded in the event stream.
//!
//! | `type` | Variant | Handling |
//! |--------|---------|----------|
//! | `heartbeat` | [`BusMessage::Heartbeat`] | node registry heartbeat |
//! | `telemetry` | [`BusMessage::Telemetry`] | recorded only |
//! | `event` | [`BusMessage::Event`] | recorded only |
//! | `command` | [`BusMessage::Command`] | acknowledged, never executed |
//! | other | [`BusMessage::Opaque`] | recorded only |

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

pub const HEARTBEAT: &str = "heartbeat";
pub const TELEMETRY: &str = "telemetry";
pub const EVENT: &str = "event";
pub const COMMAND: &str = "command";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryData {
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEventData {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandData {
    #[serde(default)]
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Raw envelope as posted to the bus.
#[derive(Debug, Clone, Deserialize)]
pub struct BusEnvelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// A classified bus message.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    Heartbeat(HeartbeatData),
    Telemetry(TelemetryData),
    Event(NodeEventData),
    Command(CommandData),
    /// Unrecognised type, or a known type whose data did not decode.
    Opaque { kind: String, data: Value },
}

impl BusMessage {
    /// Decode `data` according to its `kind` tag.
    ///
    /// A missing/`null` body decodes as an empty object. A known kind with a body
    /// that does not fit its schema is kept as `Opaque` under the same kind, so it
    /// is recorded but not dispatched.
    pub fn decode(kind: &str, data: Value) -> Self {
        let body = if data.is_null() { Value::Object(Default::default()) } else { data };

        let decoded = match kind {
            HEARTBEAT => serde_json::from_value(body.clone()).map(Self::Heartbeat),
            TELEMETRY => serde_json::from_value(body.clone()).map(Self::Telemetry),
            EVENT => serde_json::from_value(body.clone()).map(Self::Event),
            COMMAND => serde_json::from_value(body.clone()).map(Self::Command),
            _ => {
                return Self::Opaque { kind: kind.to_string(), data: body };
            }
        };

        decoded.unwrap_or_else(|e| {
            warn!(kind = %kind, error = %e, "Bus message data did not match its type; recording as opaque");
            Self::Opaque { kind: kind.to_string(), data: body }
        })
    }

    pub fn from_envelope(envelope: BusEnvelope) -> Self {
        Self::decode(&envelope.kind, envelope.data)
    }

    /// The `type` tag this message was classified under.
    pub fn kind(&self) -> &str {
        match self {
            Self::Heartbeat(_) => HEARTBEAT,
            Self::Telemetry(_) => TELEMETRY,
            Self::Event(_) => EVENT,
            Self::Command(_) => COMMAND,
            Self::Opaque { kind, .. } => kind,
        }
    }
}

// Serializes as the bare payload; the tag travels next to it in `FederationEvent`.
impl Serialize for BusMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Heartbeat(d) => d.serialize(serializer),
            Self::Telemetry(d) => d.serialize(serializer),
            Self::Event(d) => d.serialize(serializer),
            Self::Command(d) => d.serialize(serializer),
            Self::Opaque { data, .. } => data.serialize(serializer),
        }
    }
}
