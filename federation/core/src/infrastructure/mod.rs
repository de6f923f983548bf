// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod challenge_mac;
pub mod db;
pub mod event_stream;
pub mod federation_router;
pub mod handshake_store;
pub mod memory_store;
pub mod node_registry;
pub mod repositories;
pub mod session_cache;
pub mod token_codec;

pub use event_stream::EventStream;
pub use federation_router::FederationRouter;
pub use handshake_store::HandshakeStore;
pub use node_registry::NodeRegistry;
pub use session_cache::SessionCache;
pub use token_codec::{FederationSigner, TokenCodec};
