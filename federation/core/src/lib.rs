// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Sage Federation Core
//!
//! Trust and routing layer for federated nodes: challenge-response handshake,
//! signed federation tokens, session admission, node presence, the federation
//! event stream and per-tenant data-store routing.
//!
//! # Architecture
//!
//! - **domain:** value types, error taxonomies, repository/connector traits
//! - **application:** handshake/admission service, message classifier, sweeper
//! - **infrastructure:** in-memory stores, token codec, router, PostgreSQL adapters
//! - **presentation:** axum router, middleware and error mapping

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
