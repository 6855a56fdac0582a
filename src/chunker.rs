// ABOUTME: Character-bounded text chunking used for content and tool-call argument deltas
// ABOUTME: Produces borrowed slices whose in-order concatenation reproduces the input exactly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::num::NonZeroUsize;

/// Split `content` into consecutive slices of at most `size` characters
///
/// Counts Unicode scalar values, never bytes, so multi-byte text is never
/// cut inside a character. An empty input yields no slices at all.
pub fn chunk(content: &str, size: NonZeroUsize) -> TextChunks<'_> {
    TextChunks {
        text: content,
        cursor: 0,
        size,
    }
}

/// Byte offset where the chunk starting at `start` ends
///
/// Returns `None` once `start` has reached the end of `text`.
fn next_chunk_end(text: &str, start: usize, size: NonZeroUsize) -> Option<usize> {
    let rest = text.get(start..).filter(|r| !r.is_empty())?;
    let len = rest
        .char_indices()
        .nth(size.get())
        .map_or(rest.len(), |(offset, _)| offset);
    Some(start + len)
}

/// Lazy iterator over the chunks of a string
#[derive(Debug, Clone)]
pub struct TextChunks<'a> {
    text: &'a str,
    cursor: usize,
    size: NonZeroUsize,
}

impl TextChunks<'_> {
    /// Continue from a byte offset previously returned by [`Self::position`]
    pub const fn resume_at(mut self, offset: usize) -> Self {
        self.cursor = offset;
        self
    }

    /// Byte offset of the first character not yet yielded
    pub const fn position(&self) -> usize {
        self.cursor
    }
}

impl<'a> Iterator for TextChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let end = next_chunk_end(self.text, self.cursor, self.size)?;
        let piece = &self.text[self.cursor..end];
        self.cursor = end;
        Some(piece)
    }
}
