//! Pagination for the discrete-page layout mode.
//!
//! The strategy is a greedy walk: advance by the target page size, then nudge
//! the cut forward to the nearest sentence boundary inside a small lookahead
//! window so pages end after punctuation instead of mid-sentence. The logic
//! is isolated so it can be swapped for a smarter layout later.

use crate::document::Page;

/// Target page size in characters.
pub const DEFAULT_PAGE_SIZE: usize = 2000;
/// How far past the target cut we search for a sentence boundary.
pub const CUT_LOOKAHEAD: usize = 100;

/// Split the text into pages of roughly `target_size` characters.
///
/// Empty input yields an empty page list; callers must handle zero pages.
pub fn paginate(text: &str, target_size: usize) -> Vec<Page> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let target = target_size.max(1);

    let mut pages = Vec::new();
    let mut cursor = 0usize;
    while cursor < chars.len() {
        let mut cut = (cursor + target).min(chars.len());
        if cut < chars.len() {
            let window_end = (cut + CUT_LOOKAHEAD).min(chars.len());
            if let Some(rel) = chars[cut..window_end]
                .iter()
                .position(|c| is_sentence_boundary(*c))
            {
                // Cut immediately after the boundary character.
                cut += rel + 1;
            }
        }
        pages.push(Page {
            text: chars[cursor..cut].iter().collect(),
            start_offset: cursor,
        });
        cursor = cut;
    }

    pages
}

fn is_sentence_boundary(c: char) -> bool {
    matches!(c, '。' | '！' | '？' | '\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpunctuated_text_cuts_exactly_at_target_size() {
        let text = "x".repeat(4500);
        let pages = paginate(&text, DEFAULT_PAGE_SIZE);
        assert_eq!(pages.len(), 3);
        let offsets: Vec<usize> = pages.iter().map(|p| p.start_offset).collect();
        assert_eq!(offsets, vec![0, 2000, 4000]);
        assert_eq!(pages[2].text.chars().count(), 500);
    }

    #[test]
    fn cuts_after_nearby_sentence_punctuation() {
        // Boundary 30 chars past the target: the page stretches to include it.
        let mut text = "甲".repeat(2030);
        text.push('。');
        text.push_str(&"乙".repeat(500));
        let pages = paginate(&text, 2000);
        assert_eq!(pages[0].text.chars().count(), 2031);
        assert!(pages[0].text.ends_with('。'));
        assert_eq!(pages[1].start_offset, 2031);
    }

    #[test]
    fn boundary_outside_lookahead_window_is_ignored() {
        // The only punctuation sits 150 chars past the target, beyond the
        // lookahead window, so the cut lands exactly at the target.
        let mut text = "a".repeat(2150);
        text.push('！');
        text.push_str(&"b".repeat(100));
        let pages = paginate(&text, 2000);
        assert_eq!(pages[1].start_offset, 2000);
    }

    #[test]
    fn newline_counts_as_a_sentence_boundary() {
        let mut text = "c".repeat(2010);
        text.push('\n');
        text.push_str(&"d".repeat(50));
        let pages = paginate(&text, 2000);
        assert_eq!(pages[1].start_offset, 2011);
    }

    #[test]
    fn page_offsets_are_strictly_increasing() {
        let text = "短句。".repeat(3000);
        let pages = paginate(&text, DEFAULT_PAGE_SIZE);
        for pair in pages.windows(2) {
            assert!(
                pair[0].start_offset < pair[1].start_offset,
                "page offsets must be strictly increasing"
            );
        }
        let total: usize = pages.iter().map(|p| p.text.chars().count()).sum();
        assert_eq!(total, text.chars().count(), "pages must cover all text");
    }

    #[test]
    fn empty_input_yields_no_pages() {
        assert!(paginate("", DEFAULT_PAGE_SIZE).is_empty());
    }
}
