// ABOUTME: Server state holding the immutable proxy configuration and the shared backend client
// ABOUTME: Loaded once at startup and passed to every handler; no per-request state lives here
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use llama_stream::backend::Backend;
use llama_stream::config::ProxyConfig;

/// Shared server state handle
pub type SharedState = Arc<ServerState>;

/// Read-only state shared by all request handlers
///
/// Nothing in here is mutated after startup, so concurrent requests never
/// contend on it. Connection pooling is internal to the backend client.
pub struct ServerState {
    config: ProxyConfig,
    backend: Arc<dyn Backend>,
}

impl ServerState {
    /// Create server state from a validated configuration and backend
    pub fn new(config: ProxyConfig, backend: Arc<dyn Backend>) -> Self {
        Self { config, backend }
    }

    /// Process-wide configuration
    pub const fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Backend client shared across requests
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }
}
