//! Coordinate mapping across chapters, lines, pages, and scroll fractions.
//!
//! The mapper is a stateless view over indexes built once per document. All
//! lookups are binary searches over the sorted offset tables; forward lookups
//! resolve an offset to the containing entry (ties go to the later entry),
//! inverse lookups recover the entry's starting offset.

use crate::document::{Chapter, LineIndex, Page};

/// The per-document index for whichever layout mode is active.
#[derive(Debug, Clone)]
pub enum LayoutIndex {
    /// Continuous scrolling: a line/offset table.
    Lines(LineIndex),
    /// Discrete pagination: fixed-size pages.
    Pages(Vec<Page>),
}

impl LayoutIndex {
    pub fn page_count(&self) -> usize {
        match self {
            LayoutIndex::Lines(_) => 0,
            LayoutIndex::Pages(pages) => pages.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        match self {
            LayoutIndex::Lines(index) => index.len(),
            LayoutIndex::Pages(_) => 0,
        }
    }
}

/// A position expressed in every representation the host understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPosition {
    pub char_offset: usize,
    pub chapter_index: usize,
    pub line_index: Option<usize>,
    pub page_index: Option<usize>,
    pub scroll_fraction: f32,
}

/// Borrowing view that answers ad-hoc coordinate queries.
#[derive(Debug, Clone, Copy)]
pub struct PositionMap<'a> {
    chapters: &'a [Chapter],
    layout: &'a LayoutIndex,
    char_len: usize,
}

impl<'a> PositionMap<'a> {
    pub fn new(chapters: &'a [Chapter], layout: &'a LayoutIndex, char_len: usize) -> Self {
        debug_assert!(!chapters.is_empty(), "chapter table is never empty");
        Self {
            chapters,
            layout,
            char_len,
        }
    }

    pub fn chapters(&self) -> &'a [Chapter] {
        self.chapters
    }

    /// Index of the last chapter whose `start_offset <= char_offset`.
    /// Ties on a chapter start resolve to the later chapter by construction.
    pub fn chapter_at(&self, char_offset: usize) -> usize {
        self.chapters
            .partition_point(|c| c.start_offset <= char_offset)
            .saturating_sub(1)
    }

    /// Index of the line containing `char_offset` (scroll layout only).
    pub fn line_at(&self, char_offset: usize) -> Option<usize> {
        match self.layout {
            LayoutIndex::Lines(index) => Some(
                index
                    .line_start_offsets
                    .partition_point(|start| *start <= char_offset)
                    .saturating_sub(1),
            ),
            LayoutIndex::Pages(_) => None,
        }
    }

    /// Index of the page containing `char_offset` (paged layout only).
    pub fn page_at(&self, char_offset: usize) -> Option<usize> {
        match self.layout {
            LayoutIndex::Lines(_) => None,
            LayoutIndex::Pages(pages) if pages.is_empty() => None,
            LayoutIndex::Pages(pages) => Some(
                pages
                    .partition_point(|p| p.start_offset <= char_offset)
                    .saturating_sub(1),
            ),
        }
    }

    pub fn offset_for_chapter_start(&self, chapter_index: usize) -> Option<usize> {
        self.chapters.get(chapter_index).map(|c| c.start_offset)
    }

    pub fn offset_for_line(&self, line_index: usize) -> Option<usize> {
        match self.layout {
            LayoutIndex::Lines(index) => index.line_start_offsets.get(line_index).copied(),
            LayoutIndex::Pages(_) => None,
        }
    }

    pub fn offset_for_page(&self, page_index: usize) -> Option<usize> {
        match self.layout {
            LayoutIndex::Lines(_) => None,
            LayoutIndex::Pages(pages) => pages.get(page_index).map(|p| p.start_offset),
        }
    }

    /// Express one offset in every coordinate the host understands.
    pub fn resolve(&self, char_offset: usize) -> ResolvedPosition {
        let char_offset = if self.char_len == 0 {
            0
        } else {
            char_offset.min(self.char_len - 1)
        };
        ResolvedPosition {
            char_offset,
            chapter_index: self.chapter_at(char_offset),
            line_index: self.line_at(char_offset),
            page_index: self.page_at(char_offset),
            scroll_fraction: estimate_scroll_fraction(char_offset, self.char_len),
        }
    }
}

/// Approximate the scroll fraction for an offset before first layout.
///
/// This is a best-effort estimate, not an exact inverse of the host's
/// continuous scroll: real line heights vary, so the only guarantee is
/// monotonicity (a larger offset never yields a smaller estimate). The host
/// supplies the exact pixel position once content is actually laid out.
pub fn estimate_scroll_fraction(char_offset: usize, document_len: usize) -> f32 {
    if document_len == 0 {
        return 0.0;
    }
    (char_offset as f32 / document_len as f32).clamp(0.0, 1.0)
}
