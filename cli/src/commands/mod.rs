// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the sagefed CLI

pub mod config;
pub mod db;
pub mod node;
pub mod token;

pub use self::config::ConfigCommand;
pub use self::db::DbCommand;
pub use self::node::NodeCommand;
pub use self::token::TokenCommand;
