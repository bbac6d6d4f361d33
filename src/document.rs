//! Core data model for an open document.
//!
//! Every coordinate in the engine is a *character* offset into the document
//! text, never a byte offset. Regex matches and string slices are converted at
//! the boundary so that line, page, and chapter tables all agree on the same
//! axis regardless of how many bytes a glyph occupies.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An immutable snapshot of the raw text for one loaded book.
///
/// Created once per load and replaced wholesale when the host opens another
/// book; there is no in-place mutation. The text is reference-counted so a
/// background parse can hold it without copying megabytes.
#[derive(Debug, Clone)]
pub struct Document {
    text: Arc<str>,
    char_len: usize,
}

impl Document {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let char_len = text.chars().count();
        Self { text, char_len }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    /// Length of the document in characters.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }
}

/// A titled, contiguous character range within a document.
///
/// Chapters are ordered by `start_offset` and tile `[0, char_len)` with no
/// gaps or overlaps; `end_offset` of chapter `i` equals `start_offset` of
/// chapter `i + 1`, and the last chapter ends at the document length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Per-line starting offsets for virtual scrolling.
///
/// `line_start_offsets[i]` is the character offset of `lines[i]`, counting
/// every newline consumed so far. Built once per document, read-only after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    pub lines: Vec<String>,
    pub line_start_offsets: Vec<usize>,
}

impl LineIndex {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// One fixed-size, punctuation-aware slice of the document (paged layout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub text: String,
    pub start_offset: usize,
}

/// Where the reader currently is — the single source of truth.
///
/// `fraction` is the host-reported relative scroll position in `[0, 1]`;
/// `char_offset` is the engine-side coordinate. The two are related only by
/// estimation (see `mapper::estimate_scroll_fraction`), never kept exactly in
/// sync once real layout exists.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub char_offset: usize,
    pub fraction: f32,
}

impl Position {
    pub fn clamped(char_offset: usize, fraction: f32, char_len: usize) -> Self {
        let char_offset = if char_len == 0 {
            0
        } else {
            char_offset.min(char_len - 1)
        };
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            char_offset,
            fraction,
        }
    }
}
