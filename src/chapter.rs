//! Heuristic chapter detection.
//!
//! Headings are recognized by an ordered cascade of pattern tiers, strongest
//! signal first. Each tier is matched against the whole document and the
//! first tier that produces at least one accepted heading wins outright; the
//! lower tiers are a fallback chain, not a merge. This keeps a book with real
//! `第N章` markers from also picking up decorated scene breaks, while still
//! giving a plain numbered manuscript a usable table of contents.

use crate::document::Chapter;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Title of the synthetic chapter emitted when no heading survives, and of
/// the leading filler chapter when the first heading starts past offset 0.
pub const FALLBACK_TITLE: &str = "Body";

/// Accepted headings closer than this (in chars) to the previous accepted
/// heading are dropped as duplicates of the same physical heading.
const DEDUP_DISTANCE: usize = 10;

const MIN_TITLE_CHARS: usize = 2;
const MAX_TITLE_CHARS: usize = 60;

// Tier 1: explicit chapter/volume/part markers in CJK numbering conventions,
// with optional bracketing around the marker.
static RE_CJK_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t　]*[【〔\[（(]?第[0-9０-９零〇一二三四五六七八九十百千万两]+[章节卷回部集篇话][】〕\]）)]?[^\n]{0,60}$",
    )
    .unwrap()
});

// Tier 2: named special sections, CJK and English.
static RE_NAMED_SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t　]*(?:序章|序言|楔子|引子|前言|尾声|终章|后记|番外篇?|外传|完结感言|大结局|全书完|(?i:prologue|foreword|preface|interlude|epilogue|afterword|postscript|extra\s+chapter|the\s+end))[^\n]{0,40}$",
    )
    .unwrap()
});

// Tier 3: foreign chapter/part/volume/episode keywords with an optional
// Arabic or Roman numeral.
static RE_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?mi)^[ \t　]*(?:chapter|part|volume|book|episode|section|chap\.)[ \t]*(?:[0-9]{1,4}|[ivxlcdm]{1,8})?\b[^\n]{0,60}$",
    )
    .unwrap()
});

// Tier 4: bare numeric or ordinal-word enumeration followed by a short
// fragment. The fragment length bound keeps this from firing on prose.
static RE_ENUMERATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t　]*(?:[0-9０-９]{1,4}|[零一二三四五六七八九十百千]{1,8})(?:[、.．,，:：\-][ \t　]?|[ \t　]+)[^\n]{1,30}$",
    )
    .unwrap()
});

// Tier 5: decorated/boxed headings surrounded by rule characters, or a bare
// chapter marker alone on its own line.
static RE_DECORATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t　]*(?:[-=*#＝—～─★☆◆■]{2,}[^\n]{2,60}?[-=*#＝—～─★☆◆■]{2,}|第[0-9０-９零〇一二三四五六七八九十百千万两]+[章节卷回])[ \t　]*$",
    )
    .unwrap()
});

const TIERS: [(&str, &Lazy<Regex>); 5] = [
    ("cjk-marker", &RE_CJK_MARKER),
    ("named-section", &RE_NAMED_SECTION),
    ("keyword", &RE_KEYWORD),
    ("enumeration", &RE_ENUMERATION),
    ("decorated", &RE_DECORATED),
];

/// Detect chapter boundaries in raw text.
///
/// Pure and deterministic; never fails. The result always tiles
/// `[0, char_len)` and always contains at least one chapter — worst case a
/// single synthetic one spanning the whole document.
pub fn detect(text: &str) -> Vec<Chapter> {
    let char_len = text.chars().count();
    if char_len == 0 {
        return vec![fallback_chapter(0)];
    }

    for (tier, regex) in TIERS {
        let candidates = collect_candidates(text, regex);
        if candidates.is_empty() {
            continue;
        }
        debug!(tier, headings = candidates.len(), "Chapter tier matched");
        return chapters_from_candidates(candidates, char_len);
    }

    debug!(chars = char_len, "No chapter headings found; using fallback");
    vec![fallback_chapter(char_len)]
}

struct Candidate {
    title: String,
    char_start: usize,
}

/// Run one tier over the whole text, applying the title length gates and the
/// near-duplicate filter. Byte offsets from the regex engine are translated
/// to char offsets in a single forward pass since matches arrive in order.
fn collect_candidates(text: &str, regex: &Regex) -> Vec<Candidate> {
    let mut accepted: Vec<Candidate> = Vec::new();
    let mut chars_seen = 0usize;
    let mut bytes_seen = 0usize;

    for found in regex.find_iter(text) {
        chars_seen += text[bytes_seen..found.start()].chars().count();
        bytes_seen = found.start();
        let char_start = chars_seen;

        let title = found.as_str().trim();
        let title_chars = title.chars().count();
        if !(MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&title_chars) {
            continue;
        }
        if let Some(last) = accepted.last() {
            if char_start.saturating_sub(last.char_start) < DEDUP_DISTANCE {
                continue;
            }
        }
        accepted.push(Candidate {
            title: title.to_string(),
            char_start,
        });
    }

    accepted
}

fn chapters_from_candidates(candidates: Vec<Candidate>, char_len: usize) -> Vec<Chapter> {
    let mut chapters = Vec::with_capacity(candidates.len() + 1);

    // Headings never start at a negative offset, but they can start past 0;
    // a leading filler chapter keeps the table covering the whole document.
    if candidates[0].char_start > 0 {
        chapters.push(Chapter {
            title: FALLBACK_TITLE.to_string(),
            start_offset: 0,
            end_offset: candidates[0].char_start,
        });
    }

    for (idx, candidate) in candidates.iter().enumerate() {
        let end_offset = candidates
            .get(idx + 1)
            .map(|next| next.char_start)
            .unwrap_or(char_len);
        chapters.push(Chapter {
            title: candidate.title.clone(),
            start_offset: candidate.char_start,
            end_offset,
        });
    }

    chapters
}

fn fallback_chapter(char_len: usize) -> Chapter {
    Chapter {
        title: FALLBACK_TITLE.to_string(),
        start_offset: 0,
        end_offset: char_len,
    }
}
