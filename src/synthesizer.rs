// ABOUTME: Stream synthesizer turning one complete ChatResponse into an ordered event sequence
// ABOUTME: Lazy state machine: role, content chunks, tool-call deltas, finish reason, sentinel
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Stream Synthesis
//!
//! The backend only answers with complete responses, so the stream is built
//! after the fact: the first byte a client sees cannot precede the end of
//! backend generation. What the synthesizer guarantees is that the events,
//! once reassembled by a streaming client, rebuild the original message.
//!
//! Phases run strictly in order and are never revisited:
//!
//! 1. one role event (`assistant`), always
//! 2. zero or more content chunks
//! 3. every tool call's deltas, call by call, never interleaved
//! 4. one finish event
//! 5. the `[DONE]` sentinel

use std::iter::FusedIterator;
use std::num::NonZeroUsize;

use crate::chunker::chunk;
use crate::tool_delta::{split, DeltaCursor, ToolCallDelta};
use crate::types::{ChatResponse, FinishReason, ResponseMetadata};

/// Default number of characters per content or argument chunk
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(50) {
    Some(size) => size,
    None => unreachable!(),
};

/// One synthesized stream event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Role announcement, always first
    Role,
    /// A slice of the message content
    Content(String),
    /// A slice of one tool call
    ToolCall(ToolCallDelta),
    /// Terminal event carrying only the finish reason
    Finish(FinishReason),
    /// End-of-stream sentinel
    Done,
}

/// Chunk sizes applied during synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Maximum characters per content chunk
    pub content_chunk_size: NonZeroUsize,
    /// Maximum characters per argument fragment
    pub argument_chunk_size: NonZeroUsize,
}

impl SynthesisOptions {
    /// Use the same size for content and arguments
    #[must_use]
    pub const fn new(chunk_size: NonZeroUsize) -> Self {
        Self {
            content_chunk_size: chunk_size,
            argument_chunk_size: chunk_size,
        }
    }

    /// Override the argument fragment size
    #[must_use]
    pub const fn with_argument_chunk_size(mut self, size: NonZeroUsize) -> Self {
        self.argument_chunk_size = size;
        self
    }
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Start,
    Content { offset: usize },
    ToolCalls { position: usize, cursor: DeltaCursor },
    Finish,
    Sentinel,
    Finished,
}

/// Lazy event producer for a single response
///
/// Each call to `next` computes exactly one event, so a consumer that stops
/// pulling (for example after a client disconnect) stops all further work.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    response: ChatResponse,
    options: SynthesisOptions,
    phase: Phase,
}

impl Synthesizer {
    /// Create a synthesizer positioned before the role event
    pub fn new(response: ChatResponse, options: SynthesisOptions) -> Self {
        Self {
            response,
            options,
            phase: Phase::Start,
        }
    }

    /// Envelope fields of the response being streamed
    pub const fn metadata(&self) -> &ResponseMetadata {
        &self.response.metadata
    }

    /// Whether the sentinel has already been produced
    pub const fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished)
    }
}

impl Iterator for Synthesizer {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.phase {
                Phase::Start => {
                    self.phase = Phase::Content { offset: 0 };
                    return Some(StreamEvent::Role);
                }
                Phase::Content { offset } => {
                    let text = self.response.content.as_deref().unwrap_or_default();
                    let mut pieces =
                        chunk(text, self.options.content_chunk_size).resume_at(offset);
                    if let Some(piece) = pieces.next() {
                        let piece = piece.to_owned();
                        self.phase = Phase::Content {
                            offset: pieces.position(),
                        };
                        return Some(StreamEvent::Content(piece));
                    }
                    self.phase = Phase::ToolCalls {
                        position: 0,
                        cursor: DeltaCursor::new(0),
                    };
                }
                Phase::ToolCalls { position, cursor } => {
                    let Some(call) = self.response.tool_calls.get(position) else {
                        self.phase = Phase::Finish;
                        continue;
                    };
                    let mut deltas =
                        split(call, position, self.options.argument_chunk_size).resume(cursor);
                    if let Some(delta) = deltas.next() {
                        self.phase = Phase::ToolCalls {
                            position,
                            cursor: deltas.cursor(),
                        };
                        return Some(StreamEvent::ToolCall(delta));
                    }
                    self.phase = Phase::ToolCalls {
                        position: position + 1,
                        cursor: DeltaCursor::new(position + 1),
                    };
                }
                Phase::Finish => {
                    self.phase = Phase::Sentinel;
                    return Some(StreamEvent::Finish(self.response.finish_reason.clone()));
                }
                Phase::Sentinel => {
                    self.phase = Phase::Finished;
                    return Some(StreamEvent::Done);
                }
                Phase::Finished => return None,
            }
        }
    }
}

impl FusedIterator for Synthesizer {}
