// ABOUTME: POST /v1/chat/completions handler forcing non-streaming upstream and streaming downstream
// ABOUTME: Relays errors and non-stream requests unchanged, synthesizes SSE for stream requests
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use bytes::Bytes;
use llama_stream::backend::{forward_headers, BackendRequest};
use llama_stream::parse::parse_chat_response;
use llama_stream::synthesizer::Synthesizer;
use llama_stream::types::ProxyError;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::error_response;
use crate::passthrough::relay;
use crate::state::SharedState;
use crate::streaming;

/// Handle POST /v1/chat/completions
///
/// The backend is always asked for a complete response. When the client
/// asked for `stream: true` that response is re-expressed as an SSE stream;
/// otherwise it is relayed as-is. Backend failures are reported as a single
/// JSON error and never start a stream.
///
/// The first SSE byte cannot leave before the backend has finished
/// generating: the whole completion is awaited before synthesis starts.
pub async fn handle(
    State(state): State<SharedState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut request = match parse_request_body(&body) {
        Ok(map) => map,
        Err(e) => return error_response(&e),
    };

    let wants_stream = request
        .get("stream")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    force_non_streaming(&mut request);

    let outbound = match serde_json::to_vec(&Value::Object(request)) {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) => {
            return error_response(&ProxyError::internal(format!(
                "Failed to serialize backend request: {e}"
            )))
        }
    };

    let path_and_query = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned());

    debug!(
        backend = %state.backend().target(),
        path = %path_and_query,
        stream = wants_stream,
        "Dispatching completion"
    );

    let backend_request = BackendRequest {
        method: Method::POST,
        path_and_query,
        headers: forward_headers(&headers),
        body: outbound,
    };

    let response = match state.backend().send(backend_request).await {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    if !response.status.is_success() || !response.is_json() {
        warn!(
            status = %response.status,
            json = response.is_json(),
            "Relaying backend response without synthesis"
        );
        return relay(response);
    }

    if !wants_stream {
        return relay(response);
    }

    match parse_chat_response(&response.body) {
        Ok(parsed) => {
            debug!(
                content = parsed.content.is_some(),
                tool_calls = parsed.tool_calls.len(),
                finish_reason = %parsed.finish_reason,
                "Synthesizing stream"
            );
            streaming::sse_response(Synthesizer::new(parsed, state.config().synthesis))
        }
        Err(e) => error_response(&with_backend_detail(e, &response.body)),
    }
}

/// Attach what the backend actually said to a parse failure
///
/// Prefers the backend's own `error.message`, falling back to the raw body.
fn with_backend_detail(err: ProxyError, body: &[u8]) -> ProxyError {
    let backend_message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    ProxyError {
        message: format!("{}; backend said: {backend_message}", err.message),
        ..err
    }
}

/// Decode the inbound body, which must be a JSON object
fn parse_request_body(body: &[u8]) -> Result<Map<String, Value>, ProxyError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ProxyError::invalid_request(
            "Request body must be a JSON object",
        )),
        Err(e) => Err(ProxyError::invalid_request(format!(
            "Invalid JSON payload: {e}"
        ))),
    }
}

/// Rewrite the outbound copy so the backend answers in one piece
fn force_non_streaming(request: &mut Map<String, Value>) {
    request.insert("stream".to_owned(), Value::Bool(false));
    // only valid alongside stream=true
    request.remove("stream_options");
}

/// Monotonic counter ensuring unique IDs even for requests within the same second
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique completion ID
///
/// Combines the unix timestamp with a monotonically increasing counter
/// to guarantee uniqueness across concurrent and rapid-fire requests.
pub fn generate_id() -> String {
    let ts = unix_timestamp();
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("chatcmpl-{ts:x}{seq:08x}")
}

/// Get current unix timestamp in seconds
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use llama_stream::types::ErrorKind;

    use super::*;

    #[test]
    fn force_non_streaming_overrides_client_flag() {
        let mut request = parse_request_body(
            br#"{"model":"m","messages":[],"stream":true,"stream_options":{"include_usage":true}}"#,
        )
        .expect("object");
        force_non_streaming(&mut request);
        assert_eq!(request["stream"], Value::Bool(false));
        assert!(!request.contains_key("stream_options"));
        assert_eq!(request["model"], "m");
    }

    #[test]
    fn force_non_streaming_adds_missing_flag() {
        let mut request = parse_request_body(br#"{"messages":[]}"#).expect("object");
        force_non_streaming(&mut request);
        assert_eq!(request["stream"], Value::Bool(false));
    }

    #[test]
    fn non_object_body_is_invalid_request() {
        let err = parse_request_body(b"[1,2,3]").expect_err("should fail");
        assert_eq!(err.kind, ErrorKind::InvalidRequest);
    }

    #[test]
    fn garbage_body_is_invalid_request() {
        let err = parse_request_body(b"messages=hi").expect_err("should fail");
        assert_eq!(err.kind, ErrorKind::InvalidRequest);
        assert!(err.message.contains("Invalid JSON"));
    }

    #[test]
    fn backend_error_message_is_attached() {
        let err = with_backend_detail(
            ProxyError::malformed_response("Response has no choices"),
            br#"{"error":{"message":"model crashed: CUDA OOM"}}"#,
        );
        assert_eq!(err.kind, ErrorKind::MalformedResponse);
        assert!(err.message.starts_with("Response has no choices"));
        assert!(err.message.ends_with("model crashed: CUDA OOM"));
    }

    #[test]
    fn raw_body_is_attached_without_error_object() {
        let err = with_backend_detail(
            ProxyError::malformed_response("Response has no choices"),
            br#"{"status":"loading"}"#,
        );
        assert!(err.message.contains(r#"{"status":"loading"}"#));
    }

    #[test]
    fn generate_id_has_prefix() {
        let id = generate_id();
        assert!(id.starts_with("chatcmpl-"));
    }

    #[test]
    fn generate_id_is_unique() {
        assert_ne!(generate_id(), generate_id());
    }
}
