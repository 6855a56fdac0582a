// ABOUTME: Backend abstraction for the single non-streaming request/response call per client request
// ABOUTME: Provides the Backend trait, header forwarding policy, and a reqwest-based client
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, StatusCode};

use crate::types::ProxyError;

/// Outbound request to the backend
#[derive(Debug, Clone)]
pub struct BackendRequest {
    /// HTTP method
    pub method: Method,
    /// Path plus optional query string, starting with `/`
    pub path_and_query: String,
    /// Headers to send (already filtered)
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

/// Complete backend response, body fully read
#[derive(Debug, Clone)]
pub struct BackendResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

impl BackendResponse {
    /// Whether the backend labelled the body as JSON
    pub fn is_json(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
    }
}

/// Non-streaming chat backend
///
/// Implementations must be `Send + Sync` so one instance can be shared by
/// every request handler. Any pooling happens inside the implementation.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Base URL requests are sent to, for logging
    fn target(&self) -> &str;

    /// Send one request and wait for the complete response
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, ProxyError>;
}

/// Select the inbound headers that are forwarded to the backend
///
/// Only `Authorization`, `Content-Type` and `Accept` are passed on, the
/// latter two defaulting to `application/json` and `*/*`. Empty values are
/// dropped.
pub fn forward_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Some(auth) = inbound.get(AUTHORIZATION).filter(|v| !v.is_empty()) {
        headers.insert(AUTHORIZATION, auth.clone());
    }

    let content_type = inbound
        .get(CONTENT_TYPE)
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, content_type);

    let accept = inbound
        .get(ACCEPT)
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT, accept);

    headers
}

/// Markers left in an error chain by a failed TLS handshake
const TLS_FAILURE_MARKERS: &[&str] = &[
    "certificate",
    "handshake",
    "tls",
    "ssl",
    "corrupt message",
];

/// Whether a transport error chain reports a TLS failure
///
/// The HTTP client does not expose TLS failures as a typed variant, so the
/// `source()` chain is scanned. The outermost layer only names the URL and
/// is skipped, so a host name cannot trigger a match.
pub fn is_tls_failure(err: &(dyn std::error::Error + 'static)) -> bool {
    std::iter::successors(err.source(), |e| e.source()).any(|e| {
        let text = e.to_string().to_ascii_lowercase();
        TLS_FAILURE_MARKERS.iter().any(|marker| text.contains(marker))
    })
}

/// Render an error with all of its sources, outermost first
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    std::iter::successors(Some(err), |e| e.source())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

// ============================================================================
// Reqwest Backend
// ============================================================================

#[cfg(feature = "http-backend")]
pub use reqwest_backend::ReqwestBackend;

#[cfg(feature = "http-backend")]
mod reqwest_backend {
    use async_trait::async_trait;
    use tracing::debug;

    use super::{error_chain, is_tls_failure, Backend, BackendRequest, BackendResponse};
    use crate::config::{ProxyConfig, TlsVerification};
    use crate::types::ProxyError;

    /// Backend client over a shared `reqwest::Client`
    ///
    /// The client is built once at startup and applies the configured TLS
    /// verification mode and request timeout to every call.
    pub struct ReqwestBackend {
        client: reqwest::Client,
        target_url: String,
    }

    impl ReqwestBackend {
        /// Build the client from the proxy configuration
        pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
            let mut builder = reqwest::Client::builder();

            if let Some(timeout) = config.request_timeout {
                builder = builder.timeout(timeout);
            }

            builder = match &config.tls {
                TlsVerification::System => builder,
                TlsVerification::Disabled => builder.danger_accept_invalid_certs(true),
                TlsVerification::CaBundle(path) => {
                    let pem = std::fs::read(path).map_err(|e| {
                        ProxyError::config(format!(
                            "Cannot read CA bundle {}: {e}",
                            path.display()
                        ))
                    })?;
                    let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                        ProxyError::config(format!("Invalid CA bundle {}: {e}", path.display()))
                    })?;
                    if certs.is_empty() {
                        return Err(ProxyError::config(format!(
                            "CA bundle {} contains no certificates",
                            path.display()
                        )));
                    }
                    certs
                        .into_iter()
                        .fold(builder.tls_built_in_root_certs(false), |b, cert| {
                            b.add_root_certificate(cert)
                        })
                }
            };

            let client = builder
                .build()
                .map_err(|e| ProxyError::config(format!("Failed to build HTTP client: {e}")))?;

            Ok(Self {
                client,
                target_url: config.target_url.clone(),
            })
        }

        fn map_error(&self, err: &reqwest::Error) -> ProxyError {
            if err.is_timeout() {
                ProxyError::timeout(format!("Request to {} timed out", self.target_url))
            } else if is_tls_failure(err) {
                ProxyError::tls(&self.target_url, error_chain(err))
            } else {
                ProxyError::backend_unreachable(&self.target_url, error_chain(err))
            }
        }
    }

    #[async_trait]
    impl Backend for ReqwestBackend {
        fn target(&self) -> &str {
            &self.target_url
        }

        async fn send(&self, request: BackendRequest) -> Result<BackendResponse, ProxyError> {
            let url = format!("{}{}", self.target_url, request.path_and_query);
            debug!(method = %request.method, url = %url, "Forwarding request to backend");

            let response = self
                .client
                .request(request.method, &url)
                .headers(request.headers)
                .body(request.body)
                .send()
                .await
                .map_err(|e| self.map_error(&e))?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(|e| self.map_error(&e))?;

            debug!(status = %status, bytes = body.len(), "Received backend response");

            Ok(BackendResponse {
                status,
                headers,
                body,
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use std::io::Write;

        use super::*;
        use crate::types::ErrorKind;

        #[test]
        fn builds_with_verification_disabled() {
            let config = ProxyConfig::new("https://llm.internal")
                .expect("valid")
                .with_tls(TlsVerification::Disabled);
            let backend = ReqwestBackend::new(&config).expect("client");
            assert_eq!(backend.target(), "https://llm.internal");
        }

        #[test]
        fn bundle_without_certificates_is_config_error() {
            let mut file = tempfile::NamedTempFile::new().expect("tempfile");
            writeln!(file, "not a certificate").expect("write");
            let config = ProxyConfig::new("https://llm.internal")
                .expect("valid")
                .with_tls(TlsVerification::CaBundle(file.path().to_path_buf()));

            let err = ReqwestBackend::new(&config).err().expect("should fail");
            assert_eq!(err.kind, ErrorKind::Config);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct Layer {
        text: &'static str,
        source: Option<Box<Layer>>,
    }

    impl Layer {
        fn chain(texts: &[&'static str]) -> Self {
            texts
                .iter()
                .copied()
                .rev()
                .fold(None, |source, text| {
                    Some(Self {
                        text,
                        source: source.map(Box::new),
                    })
                })
                .expect("at least one layer")
        }
    }

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.text)
        }
    }

    impl std::error::Error for Layer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.source.as_deref().map(|e| e as _)
        }
    }

    #[test]
    fn certificate_rejection_deep_in_chain_is_tls_failure() {
        let err = Layer::chain(&[
            "error sending request for url (https://llm.internal/v1/chat/completions)",
            "client error (Connect)",
            "invalid peer certificate: UnknownIssuer",
        ]);
        assert!(is_tls_failure(&err));
        assert_eq!(
            error_chain(&err),
            "error sending request for url (https://llm.internal/v1/chat/completions): \
             client error (Connect): invalid peer certificate: UnknownIssuer"
        );
    }

    #[test]
    fn host_name_alone_is_not_tls_failure() {
        let err = Layer::chain(&[
            "error sending request for url (https://ssl-gateway.internal/v1/models)",
            "tcp connect error: Connection refused (os error 111)",
        ]);
        assert!(!is_tls_failure(&err));
    }

    #[test]
    fn refused_connection_is_not_tls_failure() {
        let err = Layer::chain(&[
            "error sending request for url (http://127.0.0.1:9/v1/models)",
            "client error (Connect)",
            "tcp connect error: Connection refused (os error 111)",
        ]);
        assert!(!is_tls_failure(&err));
    }

    #[test]
    fn forward_headers_applies_defaults() {
        let headers = forward_headers(&HeaderMap::new());
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[ACCEPT], "*/*");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn forward_headers_keeps_auth_and_drops_others() {
        let mut inbound = HeaderMap::new();
        inbound.insert(AUTHORIZATION, HeaderValue::from_static("Bearer sk-test"));
        inbound.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        inbound.insert("x-request-id", HeaderValue::from_static("abc"));
        inbound.insert(http::header::HOST, HeaderValue::from_static("127.0.0.1:8066"));

        let headers = forward_headers(&inbound);
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-test");
        assert_eq!(headers[ACCEPT], "text/event-stream");
        assert!(headers.get("x-request-id").is_none());
        assert!(headers.get(http::header::HOST).is_none());
    }

    #[test]
    fn empty_authorization_is_dropped() {
        let mut inbound = HeaderMap::new();
        inbound.insert(AUTHORIZATION, HeaderValue::from_static(""));
        assert!(forward_headers(&inbound).get(AUTHORIZATION).is_none());
    }

    #[test]
    fn is_json_checks_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        let response = BackendResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::new(),
        };
        assert!(response.is_json());
    }
}
