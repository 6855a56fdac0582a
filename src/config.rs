// ABOUTME: Process-wide proxy configuration loaded once at startup and immutable afterwards
// ABOUTME: Parses raw TOML-shaped settings, applies defaults, and validates them up front
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::synthesizer::{SynthesisOptions, DEFAULT_CHUNK_SIZE};
use crate::types::ProxyError;

/// Path of the chat completions endpoint
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Path of the model listing endpoint, always forwarded unchanged
pub const MODELS_PATH: &str = "/v1/models";

/// Default listen port
const DEFAULT_PORT: u16 = 8066;

/// Default listen host (all interfaces)
const DEFAULT_HOST: &str = "0.0.0.0";

/// Default log verbosity
const DEFAULT_LOG_LEVEL: &str = "info";

/// Accepted `log_level` values
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// How the backend's TLS certificate is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsVerification {
    /// Verify against the built-in trust store
    System,
    /// Accept any certificate
    Disabled,
    /// Verify against the PEM bundle at this path only
    CaBundle(PathBuf),
}

/// Validated proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Backend base URL without trailing slash
    pub target_url: String,
    /// Backend TLS verification mode
    pub tls: TlsVerification,
    /// Upper bound on one backend call
    pub request_timeout: Option<Duration>,
    /// Chunk sizes used by the synthesizer
    pub synthesis: SynthesisOptions,
    /// Extra paths forwarded unchanged (besides `/v1/models`)
    pub passthrough_paths: Vec<String>,
    /// Default tracing filter level
    pub log_level: String,
}

impl ProxyConfig {
    /// Create a configuration with defaults for everything but the backend URL
    pub fn new(target_url: &str) -> Result<Self, ProxyError> {
        Ok(Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            target_url: validate_target_url(target_url)?,
            tls: TlsVerification::System,
            request_timeout: None,
            synthesis: SynthesisOptions::default(),
            passthrough_paths: Vec::new(),
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
        })
    }

    /// Set the request timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the synthesis chunk sizes
    #[must_use]
    pub const fn with_synthesis(mut self, synthesis: SynthesisOptions) -> Self {
        self.synthesis = synthesis;
        self
    }

    /// Set the extra passthrough paths
    #[must_use]
    pub fn with_passthrough_paths(mut self, paths: Vec<String>) -> Self {
        self.passthrough_paths = paths;
        self
    }

    /// Set the TLS verification mode
    #[must_use]
    pub fn with_tls(mut self, tls: TlsVerification) -> Self {
        self.tls = tls;
        self
    }

    /// Validate raw settings and fill in defaults
    pub fn from_raw(raw: RawConfig) -> Result<Self, ProxyError> {
        let target_url = raw
            .target_url
            .as_deref()
            .ok_or_else(|| ProxyError::config("target_url is required"))?;
        let mut config = Self::new(target_url)?;

        if let Some(host) = raw.host {
            if host.trim().is_empty() {
                return Err(ProxyError::config("host must not be empty"));
            }
            config.host = host;
        }
        if let Some(port) = raw.proxy_port {
            config.port = port;
        }

        config.tls = match raw.verify_ssl {
            None => TlsVerification::System,
            Some(raw_verify) => parse_tls_verification(raw_verify)?,
        };

        if let Some(secs) = raw.request_timeout {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ProxyError::config(format!(
                    "request_timeout must be a positive number of seconds, got {secs}"
                )));
            }
            let timeout = Duration::try_from_secs_f64(secs).map_err(|e| {
                ProxyError::config(format!("request_timeout {secs} is out of range: {e}"))
            })?;
            config.request_timeout = Some(timeout);
        }

        let content_size = match raw.streaming_chunk_size {
            Some(n) => positive_size("streaming_chunk_size", n)?,
            None => DEFAULT_CHUNK_SIZE,
        };
        let argument_size = match raw.argument_chunk_size {
            Some(n) => positive_size("argument_chunk_size", n)?,
            None => content_size,
        };
        config.synthesis =
            SynthesisOptions::new(content_size).with_argument_chunk_size(argument_size);

        for path in &raw.passthrough_paths {
            validate_passthrough_path(path)?;
        }
        config.passthrough_paths = raw.passthrough_paths;

        if let Some(level) = raw.log_level {
            config.log_level = validate_log_level(&level)?;
        }

        Ok(config)
    }

    /// Parse and validate a TOML document
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(input: &str) -> Result<Self, ProxyError> {
        Self::from_raw(RawConfig::from_toml_str(input)?)
    }

    /// All paths forwarded unchanged to the backend
    pub fn forwarded_paths(&self) -> impl Iterator<Item = &str> {
        std::iter::once(MODELS_PATH).chain(
            self.passthrough_paths
                .iter()
                .enumerate()
                .filter(|(i, p)| {
                    p.as_str() != MODELS_PATH && !self.passthrough_paths[..*i].contains(p)
                })
                .map(|(_, p)| p.as_str()),
        )
    }
}

// ============================================================================
// Raw (unvalidated) settings
// ============================================================================

/// Settings as written in the config file, before validation
///
/// Unknown keys are ignored so older binaries accept newer files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    /// Listen host
    #[serde(default)]
    pub host: Option<String>,
    /// Listen port
    #[serde(default)]
    pub proxy_port: Option<u16>,
    /// Backend base URL
    #[serde(default)]
    pub target_url: Option<String>,
    /// `true`, `false`, or a CA bundle path
    #[serde(default)]
    pub verify_ssl: Option<RawVerify>,
    /// Backend timeout in seconds
    #[serde(default)]
    pub request_timeout: Option<f64>,
    /// Characters per content chunk
    #[serde(default)]
    pub streaming_chunk_size: Option<i64>,
    /// Characters per argument fragment
    #[serde(default)]
    pub argument_chunk_size: Option<i64>,
    /// Extra passthrough paths
    #[serde(default)]
    pub passthrough_paths: Vec<String>,
    /// Log verbosity
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Raw `verify_ssl` value: a boolean or a string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawVerify {
    /// Boolean flag
    Flag(bool),
    /// `"true"`, `"false"`, or a bundle path
    Text(String),
}

impl RawConfig {
    /// Parse a TOML document without validating it
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(input: &str) -> Result<Self, ProxyError> {
        toml::from_str(input).map_err(|e| ProxyError::config(format!("Invalid config file: {e}")))
    }

    /// Read and parse a TOML file without validating it
    #[cfg(feature = "config-file")]
    pub fn load(path: &std::path::Path) -> Result<Self, ProxyError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }
}

// ============================================================================
// Validation helpers
// ============================================================================

fn validate_target_url(url: &str) -> Result<String, ProxyError> {
    let trimmed = url.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| {
            ProxyError::config(format!(
                "target_url must start with http:// or https://, got {url:?}"
            ))
        })?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(ProxyError::config(format!("target_url has no host: {url:?}")));
    }
    Ok(trimmed.to_owned())
}

fn parse_tls_verification(raw: RawVerify) -> Result<TlsVerification, ProxyError> {
    match raw {
        RawVerify::Flag(true) => Ok(TlsVerification::System),
        RawVerify::Flag(false) => Ok(TlsVerification::Disabled),
        RawVerify::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(TlsVerification::System),
            "false" => Ok(TlsVerification::Disabled),
            _ => {
                let path = PathBuf::from(text.trim());
                if !path.is_file() {
                    return Err(ProxyError::config(format!(
                        "verify_ssl CA bundle not found: {}",
                        path.display()
                    )));
                }
                Ok(TlsVerification::CaBundle(path))
            }
        },
    }
}

fn positive_size(field: &str, value: i64) -> Result<NonZeroUsize, ProxyError> {
    usize::try_from(value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            ProxyError::config(format!("{field} must be a positive integer, got {value}"))
        })
}

fn validate_passthrough_path(path: &str) -> Result<(), ProxyError> {
    if !path.starts_with('/') {
        return Err(ProxyError::config(format!(
            "passthrough path must start with '/': {path:?}"
        )));
    }
    if path == CHAT_COMPLETIONS_PATH {
        return Err(ProxyError::config(format!(
            "{CHAT_COMPLETIONS_PATH} is handled by the stream synthesizer and cannot be a passthrough path"
        )));
    }
    // literal paths only; these would be read as route captures
    if path.contains(['{', '}', '*', ':', '?']) {
        return Err(ProxyError::config(format!(
            "passthrough path must be a literal path: {path:?}"
        )));
    }
    Ok(())
}

fn validate_log_level(level: &str) -> Result<String, ProxyError> {
    let lower = level.trim().to_ascii_lowercase();
    if LOG_LEVELS.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        Err(ProxyError::config(format!(
            "Unknown log_level: {level}. Valid: {}",
            LOG_LEVELS.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    fn raw(target: &str) -> RawConfig {
        RawConfig {
            target_url: Some(target.to_owned()),
            ..RawConfig::default()
        }
    }

    #[test]
    fn defaults_are_applied() {
        let config = ProxyConfig::from_raw(raw("http://localhost:8000/")).expect("valid");
        assert_eq!(config.port, 8066);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.target_url, "http://localhost:8000");
        assert_eq!(config.tls, TlsVerification::System);
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.synthesis.content_chunk_size.get(), 50);
        assert_eq!(config.synthesis.argument_chunk_size.get(), 50);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn missing_target_url_is_config_error() {
        let err = ProxyConfig::from_raw(RawConfig::default()).expect_err("should fail");
        assert_eq!(err.kind, ErrorKind::Config);
    }

    #[test]
    fn target_url_needs_scheme_and_host() {
        assert!(ProxyConfig::new("localhost:8000").is_err());
        assert!(ProxyConfig::new("http://").is_err());
        assert!(ProxyConfig::new("https://llm.internal").is_ok());
    }

    #[test]
    fn non_positive_chunk_size_is_rejected() {
        for bad in [0, -5] {
            let mut cfg = raw("http://b");
            cfg.streaming_chunk_size = Some(bad);
            let err = ProxyConfig::from_raw(cfg).expect_err("should fail");
            assert!(err.message.contains("streaming_chunk_size"));
        }
    }

    #[test]
    fn argument_chunk_size_defaults_to_content_size() {
        let mut cfg = raw("http://b");
        cfg.streaming_chunk_size = Some(12);
        let config = ProxyConfig::from_raw(cfg).expect("valid");
        assert_eq!(config.synthesis.argument_chunk_size.get(), 12);
    }

    #[test]
    fn verify_ssl_accepts_bools_and_strings() {
        let cases = [
            (RawVerify::Flag(true), TlsVerification::System),
            (RawVerify::Flag(false), TlsVerification::Disabled),
            (RawVerify::Text("False".to_owned()), TlsVerification::Disabled),
            (RawVerify::Text("true".to_owned()), TlsVerification::System),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_tls_verification(input).expect("valid"), expected);
        }
    }

    #[test]
    fn verify_ssl_missing_bundle_is_rejected() {
        let err = parse_tls_verification(RawVerify::Text("/nonexistent/ca.pem".to_owned()))
            .expect_err("should fail");
        assert!(err.message.contains("CA bundle"));
    }

    #[test]
    fn verify_ssl_existing_bundle_is_accepted() {
        let bundle = tempfile::NamedTempFile::new().expect("tempfile");
        let path = bundle.path().to_string_lossy().into_owned();
        let tls = parse_tls_verification(RawVerify::Text(path)).expect("valid");
        assert_eq!(tls, TlsVerification::CaBundle(bundle.path().to_path_buf()));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg = raw("http://b");
        cfg.request_timeout = Some(0.0);
        assert!(ProxyConfig::from_raw(cfg).is_err());
    }

    #[test]
    fn huge_timeout_is_config_error() {
        let mut cfg = raw("http://b");
        cfg.request_timeout = Some(1e300);
        let err = ProxyConfig::from_raw(cfg).expect_err("out of range");
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn fractional_timeout_is_kept() {
        let mut cfg = raw("http://b");
        cfg.request_timeout = Some(2.5);
        let config = ProxyConfig::from_raw(cfg).expect("valid");
        assert_eq!(config.request_timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn chat_path_cannot_be_passthrough() {
        let mut cfg = raw("http://b");
        cfg.passthrough_paths = vec![CHAT_COMPLETIONS_PATH.to_owned()];
        assert!(ProxyConfig::from_raw(cfg).is_err());
    }

    #[test]
    fn relative_passthrough_path_is_rejected() {
        let mut cfg = raw("http://b");
        cfg.passthrough_paths = vec!["v1/embeddings".to_owned()];
        assert!(ProxyConfig::from_raw(cfg).is_err());
    }

    #[test]
    fn pattern_passthrough_path_is_rejected() {
        for path in ["/v1/{model}", "/v1/*rest", "/v1/files?x=1"] {
            let mut cfg = raw("http://b");
            cfg.passthrough_paths = vec![path.to_owned()];
            let err = ProxyConfig::from_raw(cfg).expect_err(path);
            assert!(err.message.contains("literal"));
        }
    }

    #[test]
    fn forwarded_paths_always_include_models_once() {
        let config = ProxyConfig::new("http://b")
            .expect("valid")
            .with_passthrough_paths(vec![
                "/v1/embeddings".to_owned(),
                MODELS_PATH.to_owned(),
                "/v1/embeddings".to_owned(),
            ]);
        let paths: Vec<_> = config.forwarded_paths().collect();
        assert_eq!(paths, vec![MODELS_PATH, "/v1/embeddings"]);
    }

    #[test]
    fn log_level_is_normalized_and_validated() {
        let mut cfg = raw("http://b");
        cfg.log_level = Some("DEBUG".to_owned());
        assert_eq!(ProxyConfig::from_raw(cfg).expect("valid").log_level, "debug");

        let mut cfg = raw("http://b");
        cfg.log_level = Some("loud".to_owned());
        assert!(ProxyConfig::from_raw(cfg).is_err());
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn parses_toml_document() {
        let config = ProxyConfig::from_toml_str(
            r#"
            proxy_port = 9000
            target_url = "https://llm.internal:8443"
            verify_ssl = false
            request_timeout = 30
            streaming_chunk_size = 16
            argument_chunk_size = 64
            passthrough_paths = ["/v1/embeddings"]
            log_level = "warn"
            some_future_key = "ignored"
            "#,
        )
        .expect("valid");

        assert_eq!(config.port, 9000);
        assert_eq!(config.tls, TlsVerification::Disabled);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.synthesis.content_chunk_size.get(), 16);
        assert_eq!(config.synthesis.argument_chunk_size.get(), 64);
        assert_eq!(config.passthrough_paths, vec!["/v1/embeddings"]);
        assert_eq!(config.log_level, "warn");
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn loads_config_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "target_url = \"http://127.0.0.1:8000\"").expect("write");
        let raw = RawConfig::load(file.path()).expect("load");
        let config = ProxyConfig::from_raw(raw).expect("valid");
        assert_eq!(config.target_url, "http://127.0.0.1:8000");
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn missing_file_is_config_error() {
        let err = RawConfig::load(std::path::Path::new("/nonexistent/llama-stream.toml"))
            .expect_err("should fail");
        assert_eq!(err.kind, ErrorKind::Config);
    }
}
