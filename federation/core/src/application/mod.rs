// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod federation_auth_service;
pub mod message_classifier;
pub mod sweeper;

pub use federation_auth_service::FederationAuthService;
pub use message_classifier::{Dispatch, MessageClassifier};
pub use sweeper::{FederationSweeper, FederationSweeperConfig, SweepReport};
