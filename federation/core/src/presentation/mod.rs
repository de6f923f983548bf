// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer
//!
//! HTTP surface that translates federation requests into application service
//! calls. No business logic lives here.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | axum router, shared state and handlers |
//! | [`middleware`] | federation token gate and tenant routing |
//! | [`error`] | `{"error": CODE}` responses |

pub mod api;
pub mod error;
pub mod middleware;

pub use api::{app, AppState};
pub use error::ApiError;
