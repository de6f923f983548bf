// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! sagefed CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** gateway composition root, operator commands and gateway client

pub mod commands;
pub mod daemon;
pub mod logging;
