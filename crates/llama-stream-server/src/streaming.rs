// ABOUTME: SSE frame emitter writing synthesized events as OpenAI chat.completion.chunk frames
// ABOUTME: One "data: {json}\n\n" frame per event, "data: [DONE]" sentinel, disconnect-aware guard
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use llama_stream::synthesizer::{StreamEvent, Synthesizer};
use llama_stream::types::{ProxyError, ResponseMetadata};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::completions::{generate_id, unix_timestamp};
use crate::openai_types::{ChatCompletionChunk, ChunkChoice, Delta};

/// Payload of the end-of-stream frame
pub const DONE_SENTINEL: &str = "[DONE]";

/// Model name used when the backend did not report one
const UNKNOWN_MODEL: &str = "unknown";

/// Convert a synthesizer into an SSE response in `OpenAI` streaming format
///
/// Every event becomes its own body frame, which hyper writes and flushes
/// before the next event is pulled, so the client observes the frames one
/// at a time. Emits:
/// 1. A role chunk with `role="assistant"`
/// 2. Content and tool-call delta chunks
/// 3. A final chunk with `finish_reason` (and `usage` when known)
/// 4. `data: [DONE]` terminator
///
/// An event that cannot be serialized ends the body with an error instead
/// of writing a partial frame.
pub fn sse_response(synthesizer: Synthesizer) -> Response {
    let envelope = ChunkEnvelope::from_metadata(synthesizer.metadata());
    let events = GuardedSynthesis::new(synthesizer);

    let frames = futures::stream::iter(events).map(move |event| {
        encode_event(&envelope, event).inspect_err(|e| {
            error!(error = %e, "Synthesis fault, aborting stream");
        })
    });

    Sse::new(frames).into_response()
}

/// Serialize one event into its SSE frame
pub fn encode_event(envelope: &ChunkEnvelope, event: StreamEvent) -> Result<Event, ProxyError> {
    let (delta, finish_reason, usage) = match event {
        StreamEvent::Done => return Ok(Event::default().data(DONE_SENTINEL)),
        StreamEvent::Role => (Delta::role(), None, None),
        StreamEvent::Content(text) => (Delta::content(text), None, None),
        StreamEvent::ToolCall(delta) => {
            if delta.is_header() {
                debug!(
                    index = delta.index,
                    function = delta.function_name.as_deref().unwrap_or_default(),
                    "Opening tool call"
                );
            }
            (Delta::tool_call(delta), None, None)
        }
        StreamEvent::Finish(reason) => (
            Delta::default(),
            Some(reason.as_str().to_owned()),
            envelope.usage.clone(),
        ),
    };

    let chunk = envelope.chunk(delta, finish_reason, usage);
    let json = serde_json::to_string(&chunk)
        .map_err(|e| ProxyError::internal(format!("Failed to serialize chunk: {e}")))?;
    Ok(Event::default().data(json))
}

// ============================================================================
// Chunk Envelope
// ============================================================================

/// Fields repeated on every chunk of one stream
#[derive(Debug, Clone)]
pub struct ChunkEnvelope {
    id: String,
    created: u64,
    model: String,
    system_fingerprint: Option<String>,
    usage: Option<Value>,
}

impl ChunkEnvelope {
    /// Copy envelope fields from the backend response, filling gaps
    pub fn from_metadata(metadata: &ResponseMetadata) -> Self {
        Self {
            id: metadata.id.clone().unwrap_or_else(generate_id),
            created: metadata.created.unwrap_or_else(unix_timestamp),
            model: metadata
                .model
                .clone()
                .unwrap_or_else(|| UNKNOWN_MODEL.to_owned()),
            system_fingerprint: metadata.system_fingerprint.clone(),
            usage: metadata.usage.clone(),
        }
    }

    fn chunk(
        &self,
        delta: Delta,
        finish_reason: Option<String>,
        usage: Option<Value>,
    ) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk",
            created: self.created,
            model: self.model.clone(),
            system_fingerprint: self.system_fingerprint.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
            usage,
        }
    }
}

// ============================================================================
// Disconnect Guard
// ============================================================================

/// Guards a synthesizer for the lifetime of a streaming response.
///
/// The HTTP layer drops the body stream as soon as the client goes away.
/// Because the synthesizer is lazy, dropping it stops all further work;
/// the guard only records that the stream ended before its sentinel.
pub struct GuardedSynthesis {
    inner: Synthesizer,
    emitted: usize,
}

impl GuardedSynthesis {
    /// Wrap a synthesizer
    pub fn new(inner: Synthesizer) -> Self {
        Self { inner, emitted: 0 }
    }

    /// Number of events handed to the HTTP layer so far
    pub const fn emitted(&self) -> usize {
        self.emitted
    }
}

impl Iterator for GuardedSynthesis {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.inner.next()?;
        self.emitted += 1;
        Some(event)
    }
}

impl Drop for GuardedSynthesis {
    fn drop(&mut self) {
        if !self.inner.is_finished() {
            let err = ProxyError::client_disconnected(format!(
                "stream dropped after {} events",
                self.emitted
            ));
            info!(frames = self.emitted, error = %err, "Client disconnected, synthesis aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use llama_stream::synthesizer::SynthesisOptions;
    use llama_stream::types::ChatResponse;

    use super::*;

    fn synthesizer(text: &str, size: usize) -> Synthesizer {
        Synthesizer::new(
            ChatResponse::text(text),
            SynthesisOptions::new(NonZeroUsize::new(size).expect("non-zero")),
        )
    }

    #[test]
    fn envelope_copies_backend_metadata() {
        let metadata = ResponseMetadata {
            id: Some("chatcmpl-abc".to_owned()),
            created: Some(42),
            model: Some("qwen".to_owned()),
            system_fingerprint: Some("fp_1".to_owned()),
            usage: None,
        };
        let envelope = ChunkEnvelope::from_metadata(&metadata);
        let chunk = envelope.chunk(Delta::role(), None, None);
        assert_eq!(chunk.id, "chatcmpl-abc");
        assert_eq!(chunk.created, 42);
        assert_eq!(chunk.model, "qwen");
        assert_eq!(chunk.system_fingerprint.as_deref(), Some("fp_1"));
    }

    #[test]
    fn envelope_fills_missing_metadata() {
        let envelope = ChunkEnvelope::from_metadata(&ResponseMetadata::default());
        let chunk = envelope.chunk(Delta::role(), None, None);
        assert!(chunk.id.starts_with("chatcmpl-"));
        assert!(chunk.created > 0);
        assert_eq!(chunk.model, UNKNOWN_MODEL);
    }

    #[test]
    fn every_event_encodes() {
        let envelope = ChunkEnvelope::from_metadata(&ResponseMetadata::default());
        for event in synthesizer("Hello world", 3) {
            assert!(encode_event(&envelope, event).is_ok());
        }
    }

    #[test]
    fn guard_counts_events_and_survives_early_drop() {
        let mut guarded = GuardedSynthesis::new(synthesizer(&"x".repeat(100), 1));
        assert_eq!(guarded.by_ref().take(3).count(), 3);
        assert_eq!(guarded.emitted(), 3);
        drop(guarded);
    }

    #[test]
    fn guard_passes_through_full_sequence() {
        let guarded = GuardedSynthesis::new(synthesizer("ab", 1));
        let events: Vec<_> = guarded.collect();
        assert_eq!(events.len(), 5);
        assert_eq!(events.last(), Some(&StreamEvent::Done));
    }
}
