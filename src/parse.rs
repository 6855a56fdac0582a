// ABOUTME: Parses a complete backend chat-completion JSON body into the normalized ChatResponse
// ABOUTME: Ignores unknown fields, resolves finish_reason defaults, rejects unusable bodies
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 dravr.ai

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::types::{
    ChatResponse, FinishReason, ProxyError, ResponseMetadata, ToolCall, ASSISTANT_ROLE,
    FUNCTION_TOOL_TYPE,
};

// ============================================================================
// Wire Types (backend response, lenient)
// ============================================================================

#[derive(Deserialize)]
struct WireCompletion {
    // envelope fields are relayed only, so any JSON type is tolerated
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    created: Option<Value>,
    #[serde(default)]
    model: Option<Value>,
    #[serde(default)]
    system_fingerprint: Option<Value>,
    #[serde(default)]
    usage: Option<Value>,
    #[serde(default)]
    choices: Option<Vec<WireChoice>>,
}

#[derive(Deserialize)]
struct WireChoice {
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type")]
    call_type: Option<String>,
    #[serde(default)]
    function: Option<WireFunction>,
}

#[derive(Deserialize)]
struct WireFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
}

// ============================================================================
// Parser
// ============================================================================

/// Parse a backend chat-completion body
///
/// Only the first choice is used. Fails with `MalformedResponse` when the
/// body is not JSON, `choices` is missing or empty, or the first message has
/// neither `content` nor `tool_calls`.
pub fn parse_chat_response(body: &[u8]) -> Result<ChatResponse, ProxyError> {
    let wire: WireCompletion = serde_json::from_slice(body)
        .map_err(|e| ProxyError::malformed_response(format!("Invalid completion JSON: {e}")))?;

    let mut choices = wire
        .choices
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ProxyError::malformed_response("Response has no choices"))?;

    if choices.len() > 1 {
        warn!(
            choices = choices.len(),
            "Backend returned multiple choices, only the first is streamed"
        );
    }
    let choice = choices.swap_remove(0);

    let message = choice
        .message
        .ok_or_else(|| ProxyError::malformed_response("Choice has no message"))?;

    if message.content.is_none() && message.tool_calls.is_none() {
        return Err(ProxyError::malformed_response(
            "Message has neither content nor tool_calls",
        ));
    }

    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, call)| convert_tool_call(index, call))
        .collect::<Result<Vec<_>, _>>()?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some(value) => FinishReason::from_wire(value),
        None if tool_calls.is_empty() => FinishReason::Stop,
        None => FinishReason::ToolCalls,
    };

    Ok(ChatResponse {
        role: message.role.unwrap_or_else(|| ASSISTANT_ROLE.to_owned()),
        content: message.content,
        tool_calls,
        finish_reason,
        metadata: ResponseMetadata {
            id: envelope_text(wire.id),
            created: wire.created.as_ref().and_then(envelope_timestamp),
            model: envelope_text(wire.model),
            system_fingerprint: envelope_text(wire.system_fingerprint),
            usage: wire.usage,
        },
    })
}

/// Non-empty string value, anything else counts as absent
fn envelope_text(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Unix seconds from an integer or a non-negative float (truncated)
fn envelope_timestamp(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| secs as u64)
    })
}

/// Normalize one wire tool call, requiring an id and a function name
fn convert_tool_call(index: usize, call: WireToolCall) -> Result<ToolCall, ProxyError> {
    let id = call
        .id
        .ok_or_else(|| ProxyError::malformed_response(format!("Tool call {index} has no id")))?;
    let function = call.function.ok_or_else(|| {
        ProxyError::malformed_response(format!("Tool call {index} has no function"))
    })?;
    let function_name = function.name.ok_or_else(|| {
        ProxyError::malformed_response(format!("Tool call {index} has no function name"))
    })?;

    // Some backends emit arguments as an object instead of a JSON string
    let arguments = match function.arguments {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    };

    Ok(ToolCall {
        id,
        call_type: call
            .call_type
            .unwrap_or_else(|| FUNCTION_TOOL_TYPE.to_owned()),
        function_name,
        arguments,
    })
}
