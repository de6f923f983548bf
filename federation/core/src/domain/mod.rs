// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Federation identity, presence and routing types with no I/O of their own.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Value types, error taxonomies and the repository/connector
//!   traits the infrastructure layer implements

pub mod clock;
pub mod config;
pub mod events;
pub mod handshake;
pub mod message;
pub mod node;
pub mod routing;
pub mod token;
