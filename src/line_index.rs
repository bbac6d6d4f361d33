//! Line index construction for virtual scrolling.
//!
//! The host renders a window of lines at a time; the cumulative offsets let
//! it translate a line index to a character position (and back) without
//! rescanning the document per frame.

use crate::document::LineIndex;

/// Split text on `\n` and record each line's starting character offset.
///
/// Empty lines are preserved as zero-length entries — the host renders them
/// as vertical spacing. The `+ 1` per line accounts for the consumed newline;
/// the final line has no trailing newline to add.
pub fn build_index(text: &str) -> LineIndex {
    let mut lines = Vec::new();
    let mut line_start_offsets = Vec::new();
    let mut offset = 0usize;

    for line in text.split('\n') {
        line_start_offsets.push(offset);
        offset += line.chars().count() + 1;
        lines.push(line.to_string());
    }

    LineIndex {
        lines,
        line_start_offsets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_accumulate_line_lengths_plus_newline() {
        let index = build_index("abc\nde\n\nf");
        assert_eq!(index.lines, vec!["abc", "de", "", "f"]);
        assert_eq!(index.line_start_offsets, vec![0, 4, 7, 8]);
    }

    #[test]
    fn tables_stay_parallel_and_non_decreasing() {
        let index = build_index("第一行\n\n第三行\n结尾");
        assert_eq!(index.lines.len(), index.line_start_offsets.len());
        for pair in index.line_start_offsets.windows(2) {
            assert!(pair[0] <= pair[1], "offsets must be non-decreasing");
        }
        // CJK lines count characters, not bytes.
        assert_eq!(index.line_start_offsets, vec![0, 4, 5, 9]);
    }

    #[test]
    fn empty_text_yields_a_single_empty_line() {
        let index = build_index("");
        assert_eq!(index.lines, vec![""]);
        assert_eq!(index.line_start_offsets, vec![0]);
    }
}
