// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

use serde::Serialize;

use crate::domain::message::BusMessage;

/// Number of events the stream retains by default.
pub const EVENT_STREAM_CAPACITY: usize = 200;

/// One recorded federation message.
///
/// Serialized as `{ts, type, nodeId, data}` with `ts` in Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationEvent {
    pub ts: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub node_id: String,
    pub data: BusMessage,
}
