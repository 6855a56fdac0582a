// ABOUTME: Core types for the streaming adapter: chat-response model, tool calls, and errors
// ABOUTME: Provides the normalized ChatResponse, FinishReason, ProxyError and ErrorKind
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Core Types
//!
//! Normalized in-memory form of one backend chat completion, created fresh
//! per request and discarded once the stream has been synthesized.

use std::fmt;

use serde_json::Value;

// ============================================================================
// Error Type
// ============================================================================

/// Error type for proxy and synthesis operations
#[derive(Debug, Clone)]
pub struct ProxyError {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// Categories of errors produced while proxying a chat completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or missing startup configuration
    Config,
    /// Inbound request body could not be used
    InvalidRequest,
    /// Connection or transport failure talking to the backend
    BackendUnreachable,
    /// TLS handshake with the backend failed (certificate rejected)
    Tls,
    /// Backend did not answer within the configured timeout
    Timeout,
    /// Backend answered 200 but the body is not a usable chat completion
    MalformedResponse,
    /// Client went away while the stream was being written
    ClientDisconnected,
    /// Internal fault (bug, unexpected state)
    Internal,
}

impl ProxyError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Config,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidRequest,
            message: message.into(),
        }
    }

    /// Create a backend-unreachable error
    pub fn backend_unreachable(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::BackendUnreachable,
            message: format!("{}: {}", target.into(), message.into()),
        }
    }

    /// Create a TLS failure error
    pub fn tls(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Tls,
            message: format!("{}: {}", target.into(), message.into()),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            message: message.into(),
        }
    }

    /// Create a malformed-response error
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::MalformedResponse,
            message: message.into(),
        }
    }

    /// Create a client-disconnected error
    pub fn client_disconnected(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ClientDisconnected,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ProxyError {}

// ============================================================================
// Finish Reason
// ============================================================================

/// Reason the backend stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural end of the message
    Stop,
    /// The model requested one or more tool calls
    ToolCalls,
    /// Token limit reached
    Length,
    /// Output withheld by a content filter
    ContentFilter,
    /// Any other value reported by the backend, carried verbatim
    Other(String),
}

impl FinishReason {
    /// Map a wire string to a finish reason
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "stop" => Self::Stop,
            "tool_calls" => Self::ToolCalls,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Wire representation used in `finish_reason`
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::ToolCalls => "tool_calls",
            Self::Length => "length",
            Self::ContentFilter => "content_filter",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Chat-Response Model
// ============================================================================

/// Role announced on the first synthesized event
pub const ASSISTANT_ROLE: &str = "assistant";

/// Tool type emitted on every header delta
pub const FUNCTION_TOOL_TYPE: &str = "function";

/// A single function invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Backend-assigned call identifier
    pub id: String,
    /// Tool type (always "function" today)
    pub call_type: String,
    /// Name of the function to invoke
    pub function_name: String,
    /// Opaque argument string, usually JSON
    pub arguments: String,
}

impl ToolCall {
    /// Create a function tool call
    pub fn function(
        id: impl Into<String>,
        function_name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: FUNCTION_TOOL_TYPE.to_owned(),
            function_name: function_name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Envelope fields copied from the backend onto every streamed chunk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMetadata {
    /// Completion identifier
    pub id: Option<String>,
    /// Unix timestamp of creation
    pub created: Option<u64>,
    /// Model that produced the completion
    pub model: Option<String>,
    /// Backend configuration fingerprint
    pub system_fingerprint: Option<String>,
    /// Token usage object, forwarded untouched
    pub usage: Option<Value>,
}

/// Normalized backend chat completion (first choice only)
///
/// Immutable once parsed. `finish_reason` is always resolved, falling back
/// to `tool_calls` when tool calls are present and `stop` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    /// Message role reported by the backend
    pub role: String,
    /// Natural-language output, if any
    pub content: Option<String>,
    /// Tool calls in backend order (may be empty)
    pub tool_calls: Vec<ToolCall>,
    /// Resolved finish reason
    pub finish_reason: FinishReason,
    /// Envelope fields for the chunk stream
    pub metadata: ResponseMetadata,
}

impl ChatResponse {
    /// Create a text-only response
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            role: ASSISTANT_ROLE.to_owned(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            metadata: ResponseMetadata::default(),
        }
    }

    /// Create a response carrying only tool calls
    #[must_use]
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: ASSISTANT_ROLE.to_owned(),
            content: None,
            tool_calls,
            finish_reason: FinishReason::ToolCalls,
            metadata: ResponseMetadata::default(),
        }
    }

    /// Override the finish reason
    #[must_use]
    pub fn with_finish_reason(mut self, finish_reason: FinishReason) -> Self {
        self.finish_reason = finish_reason;
        self
    }

    /// Attach envelope metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: ResponseMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}
