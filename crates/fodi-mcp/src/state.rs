// ABOUTME: Shared server state holding the drive collaborators and the connection registry
// ABOUTME: Built once at startup and handed by Arc to the dispatcher and transports
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use fodi::auth::AuthProvider;
use fodi::types::FileStore;

use crate::events::{ConnectionRegistry, EventsConfig};

/// Type alias for the shared state handle used across the server
pub type SharedState = Arc<ServerState>;

/// Collaborators and registries shared by tools and transports
///
/// Nothing here is mutated through the struct itself; the registry owns
/// its own lock and the collaborators are read-only from the server's side.
pub struct ServerState {
    /// Drive the tools read from
    pub store: Arc<dyn FileStore>,
    /// OAuth flow for the drive
    pub auth: Arc<dyn AuthProvider>,
    /// Live SSE subscriptions
    pub events: Arc<ConnectionRegistry>,
    /// Liveness and buffering settings for subscriptions
    pub events_config: EventsConfig,
}

impl ServerState {
    /// Create state with a fresh connection registry
    pub fn new(
        store: Arc<dyn FileStore>,
        auth: Arc<dyn AuthProvider>,
        events_config: EventsConfig,
    ) -> Self {
        Self {
            store,
            auth,
            events: Arc::new(ConnectionRegistry::new(events_config.client_timeout)),
            events_config,
        }
    }
}

/// State over the given store with config-default auth, for unit tests
#[cfg(test)]
pub(crate) fn test_state(store: impl FileStore + 'static) -> ServerState {
    let auth = fodi::NoAuth::new(&fodi::config::OAuthConfig {
        client_id: "test-client".to_owned(),
        ..fodi::config::OAuthConfig::default()
    })
    .expect("auth");
    ServerState::new(Arc::new(store), Arc::new(auth), EventsConfig::default())
}
