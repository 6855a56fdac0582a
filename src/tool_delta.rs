// ABOUTME: Decomposes one tool call into a header delta followed by argument-fragment deltas
// ABOUTME: Fragments reuse the character chunking rule and concatenate back to the full arguments
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::num::NonZeroUsize;

use crate::chunker::chunk;
use crate::types::ToolCall;

/// One incremental piece of a tool call
///
/// The header delta carries `id`, `call_type` and `function_name` with an
/// empty fragment; every later delta carries only `index` and a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallDelta {
    /// Position of the call in the response's `tool_calls`
    pub index: usize,
    /// Call identifier (header delta only)
    pub id: Option<String>,
    /// Tool type (header delta only)
    pub call_type: Option<String>,
    /// Function name (header delta only)
    pub function_name: Option<String>,
    /// Slice of the argument string
    pub arguments_fragment: String,
}

impl ToolCallDelta {
    /// Whether this is the delta that opens a call
    pub fn is_header(&self) -> bool {
        self.id.is_some()
    }
}

/// Split a tool call into its ordered delta sequence
///
/// Yields the header delta first, then one delta per argument chunk. Empty
/// arguments produce the header delta alone.
pub fn split(
    call: &ToolCall,
    index: usize,
    argument_chunk_size: NonZeroUsize,
) -> ToolCallDeltas<'_> {
    ToolCallDeltas {
        call,
        cursor: DeltaCursor::new(index),
        size: argument_chunk_size,
    }
}

/// Lazy iterator over the deltas of a single tool call
#[derive(Debug, Clone)]
pub struct ToolCallDeltas<'a> {
    call: &'a ToolCall,
    cursor: DeltaCursor,
    size: NonZeroUsize,
}

impl ToolCallDeltas<'_> {
    /// Continue from progress saved with [`Self::cursor`]
    pub(crate) const fn resume(mut self, cursor: DeltaCursor) -> Self {
        self.cursor = cursor;
        self
    }

    /// Progress so far, detached from the borrowed call
    pub(crate) const fn cursor(&self) -> DeltaCursor {
        self.cursor
    }
}

impl Iterator for ToolCallDeltas<'_> {
    type Item = ToolCallDelta;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.advance(self.call, self.size)
    }
}

/// Progress through one tool call, detached from any borrow of it
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeltaCursor {
    index: usize,
    header_sent: bool,
    offset: usize,
}

impl DeltaCursor {
    pub(crate) const fn new(index: usize) -> Self {
        Self {
            index,
            header_sent: false,
            offset: 0,
        }
    }

    /// Produce the next delta for `call`, or `None` once it is exhausted
    fn advance(&mut self, call: &ToolCall, size: NonZeroUsize) -> Option<ToolCallDelta> {
        if !self.header_sent {
            self.header_sent = true;
            return Some(ToolCallDelta {
                index: self.index,
                id: Some(call.id.clone()),
                call_type: Some(call.call_type.clone()),
                function_name: Some(call.function_name.clone()),
                arguments_fragment: String::new(),
            });
        }

        let mut fragments = chunk(&call.arguments, size).resume_at(self.offset);
        let fragment = fragments.next()?.to_owned();
        self.offset = fragments.position();

        Some(ToolCallDelta {
            index: self.index,
            id: None,
            call_type: None,
            function_name: None,
            arguments_fragment: fragment,
        })
    }
}
