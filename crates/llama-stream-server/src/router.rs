// ABOUTME: Axum router wiring the synthesized chat endpoint and the passthrough endpoints
// ABOUTME: Unknown paths fall back to an OpenAI-style 404 error body
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 dravr.ai

use axum::routing::{any, get, post};
use axum::Router;
use llama_stream::config::{CHAT_COMPLETIONS_PATH, MODELS_PATH};
use tracing::debug;

use crate::completions;
use crate::passthrough;
use crate::state::SharedState;

/// Build the application router with all endpoints
///
/// Routes:
/// - `POST /v1/chat/completions`: non-streaming upstream, SSE downstream when asked
/// - `GET /v1/models`: forwarded unchanged
/// - every configured passthrough path, any method: forwarded unchanged
///
/// Anything else receives a 404 error body.
pub fn build(state: SharedState) -> Router {
    let mut router = Router::new()
        .route(CHAT_COMPLETIONS_PATH, post(completions::handle))
        .route(MODELS_PATH, get(passthrough::handle));

    for path in state
        .config()
        .forwarded_paths()
        .filter(|p| *p != MODELS_PATH)
    {
        debug!(path, "Mounting passthrough route");
        router = router.route(path, any(passthrough::handle));
    }

    router.fallback(passthrough::not_found).with_state(state)
}
