// ABOUTME: Passthrough forwarder for /v1/models and configured non-chat endpoints
// ABOUTME: Copies method, path, query and body to the backend and relays the reply byte-for-byte
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{
    HeaderName, CONNECTION, CONTENT_LENGTH, PROXY_AUTHENTICATE, TE, TRAILER, TRANSFER_ENCODING,
    UPGRADE,
};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use llama_stream::backend::{forward_headers, BackendRequest, BackendResponse};
use tracing::debug;

use crate::error::error_response;
use crate::openai_types::ErrorResponse;
use crate::state::SharedState;

/// Headers that describe one hop and are never relayed
///
/// `Content-Length` is recomputed from the relayed body.
const HOP_BY_HOP: &[HeaderName] = &[
    CONNECTION,
    CONTENT_LENGTH,
    PROXY_AUTHENTICATE,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// Handle a passthrough endpoint
///
/// No synthesis is applied; the backend's status, headers and body are
/// returned unchanged.
pub async fn handle(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path_and_query = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned());

    debug!(method = %method, path = %path_and_query, "Forwarding passthrough request");

    let request = BackendRequest {
        method,
        path_and_query,
        headers: forward_headers(&headers),
        body,
    };

    match state.backend().send(request).await {
        Ok(response) => relay(response),
        Err(e) => error_response(&e),
    }
}

/// Relay a complete backend response to the client unchanged
pub fn relay(response: BackendResponse) -> Response {
    let mut headers = response.headers;
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");

    (response.status, headers, Body::from(response.body)).into_response()
}

/// Fallback for paths that are neither chat nor passthrough
pub async fn not_found(uri: Uri) -> Response {
    debug!(path = %uri.path(), "No route");
    let body = ErrorResponse::new("invalid_request_error", format!("Not Found: {}", uri.path()));
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::header::{CONTENT_TYPE, DATE};
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn relay_keeps_status_and_end_to_end_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(DATE, HeaderValue::from_static("Thu, 01 Jan 2026 00:00:00 GMT"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let response = relay(BackendResponse {
            status: StatusCode::IM_A_TEAPOT,
            headers,
            body: Bytes::from_static(b"{}"),
        });

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert!(response.headers().get(DATE).is_some());
        assert!(response.headers().get(TRANSFER_ENCODING).is_none());
        assert!(response.headers().get(CONNECTION).is_none());
    }
}
