// ABOUTME: OpenAI-compatible wire types for streamed chunks and error envelopes
// ABOUTME: Maps synthesized stream events onto chat.completion.chunk delta objects
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use llama_stream::tool_delta::ToolCallDelta;
use llama_stream::types::ASSISTANT_ROLE;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// Streaming Response Types
// ============================================================================

/// OpenAI-compatible streaming chunk
#[derive(Debug, Serialize)]
pub struct ChatCompletionChunk {
    /// Unique response identifier (same across all chunks)
    pub id: String,
    /// Object type (always "chat.completion.chunk")
    pub object: &'static str,
    /// Unix timestamp of creation
    pub created: u64,
    /// Model used for generation
    pub model: String,
    /// Backend configuration fingerprint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
    /// Streaming choices (always exactly one)
    pub choices: Vec<ChunkChoice>,
    /// Token usage, terminal chunk only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
}

/// A single choice in a streaming chunk
#[derive(Debug, Serialize)]
pub struct ChunkChoice {
    /// Choice index (always 0)
    pub index: u32,
    /// Incremental message fields
    pub delta: Delta,
    /// Reason the generation stopped (terminal chunk only, null before)
    pub finish_reason: Option<String>,
}

/// Delta content in a streaming chunk
#[derive(Debug, Default, Serialize)]
pub struct Delta {
    /// Role (only present on first chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
    /// Content fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool-call fragment (one entry per chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallChunk>>,
}

impl Delta {
    /// Role announcement delta
    pub const fn role() -> Self {
        Self {
            role: Some(ASSISTANT_ROLE),
            content: None,
            tool_calls: None,
        }
    }

    /// Content fragment delta
    pub fn content(text: String) -> Self {
        Self {
            role: None,
            content: Some(text),
            tool_calls: None,
        }
    }

    /// Tool-call fragment delta
    pub fn tool_call(delta: ToolCallDelta) -> Self {
        Self {
            role: None,
            content: None,
            tool_calls: Some(vec![ToolCallChunk::from(delta)]),
        }
    }
}

/// One tool-call entry inside a delta
#[derive(Debug, Serialize)]
pub struct ToolCallChunk {
    /// Position of the call in the message
    pub index: usize,
    /// Call identifier (header only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tool type (header only)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    /// Function name and argument fragment
    pub function: FunctionChunk,
}

/// Function portion of a tool-call entry
#[derive(Debug, Serialize)]
pub struct FunctionChunk {
    /// Function name (header only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Argument fragment (empty on the header)
    pub arguments: String,
}

impl From<ToolCallDelta> for ToolCallChunk {
    fn from(delta: ToolCallDelta) -> Self {
        Self {
            index: delta.index,
            id: delta.id,
            call_type: delta.call_type,
            function: FunctionChunk {
                name: delta.function_name,
                arguments: delta.arguments_fragment,
            },
        }
    }
}

// ============================================================================
// Error Response
// ============================================================================

/// OpenAI-compatible error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail within an `OpenAI` error response
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error message
    pub message: String,
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
}

impl ErrorResponse {
    /// Build an error response with the given type and message
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type: error_type.into(),
            },
        }
    }
}
