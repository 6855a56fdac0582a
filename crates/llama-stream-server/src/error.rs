// ABOUTME: Maps ProxyError kinds onto HTTP status codes and OpenAI-style error bodies
// ABOUTME: Every backend-side failure becomes one non-streamed JSON response
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 dravr.ai

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use llama_stream::types::{ErrorKind, ProxyError};
use tracing::error;

use crate::openai_types::ErrorResponse;

/// HTTP status and `OpenAI` error type for an error kind
pub const fn status_for(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::InvalidRequest => (StatusCode::BAD_REQUEST, "invalid_request_error"),
        ErrorKind::BackendUnreachable => (StatusCode::SERVICE_UNAVAILABLE, "backend_unreachable"),
        ErrorKind::Tls => (StatusCode::BAD_GATEWAY, "tls_error"),
        ErrorKind::Timeout => (StatusCode::GATEWAY_TIMEOUT, "timeout_error"),
        ErrorKind::MalformedResponse => (StatusCode::BAD_GATEWAY, "malformed_response"),
        ErrorKind::Config | ErrorKind::ClientDisconnected | ErrorKind::Internal => {
            (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
        }
    }
}

/// Build a single non-streamed error response for a proxy error
pub fn error_response(err: &ProxyError) -> Response {
    let (status, error_type) = status_for(err.kind);
    error!(kind = ?err.kind, message = %err.message, "Request failed");
    let body = ErrorResponse::new(error_type, &err.message);
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_504() {
        assert_eq!(status_for(ErrorKind::Timeout).0, StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn unreachable_maps_to_503() {
        let (status, kind) = status_for(ErrorKind::BackendUnreachable);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(kind, "backend_unreachable");
    }

    #[test]
    fn tls_failure_maps_to_502() {
        let (status, kind) = status_for(ErrorKind::Tls);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(kind, "tls_error");
    }

    #[test]
    fn malformed_maps_to_502() {
        assert_eq!(status_for(ErrorKind::MalformedResponse).0, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn invalid_request_maps_to_400() {
        let response = error_response(&ProxyError::invalid_request("not json"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
