// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Turning an extracted word stream into an indexable document.
//!
//! Four steps, in order:
//!
//! 1. **De-hyphenation.** A word ending in a hyphen at the right margin is
//!    fused with the first word of the following line (same or next page).
//!    The fused word keeps both source rectangles in `merged_from`, so a
//!    highlight over it paints two boxes.
//! 2. **Token normalisation.** NFD decomposition, combining marks stripped,
//!    lowercased, leading/trailing punctuation trimmed, whitespace collapsed.
//! 3. **Token filter.** Empty tokens, lone digits, and stop words get an
//!    empty `token` but stay in the word stream; geometry projection needs
//!    the gaps.
//! 4. **Dense re-index.** Surviving words are listed in `token_map`, giving
//!    every downstream phase a dense 0..N token space.
//!
//! The whole thing is a pure function of the extracted stream. Running it on
//! already-normalised tokens changes nothing, which the tests pin down.

use std::collections::HashSet;
use std::sync::LazyLock;

use unicode_normalization::UnicodeNormalization;

use crate::extract::RawDocument;
use crate::types::{Document, PageDims, Word};

/// How close (in PDF points) a word must end to the page text region's right
/// edge, and its continuation begin to the left edge, for hyphen fusion.
const MARGIN_EPS: f32 = 18.0;

/// Fixed English stop-word list, compiled in so every binary agrees on what
/// gets filtered.
static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    include_str!("../data/stop_words.txt")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
});

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

/// Codepoint blocks whose characters are nonspacing marks once NFD has
/// pulled them off their base letter. Not full Mn-category coverage; these
/// are the blocks Latin, Greek, and Cyrillic decompositions actually emit.
const MARK_BLOCKS: [(u32, u32); 6] = [
    (0x0300, 0x036F), // base diacritics
    (0x0483, 0x0489), // Cyrillic titlo and friends
    (0x1AB0, 0x1AFF), // diacritics extended
    (0x1DC0, 0x1DFF), // diacritics supplement
    (0x20D0, 0x20FF), // marks for symbols
    (0xFE20, 0xFE2F), // half marks
];

fn nonspacing_mark(c: char) -> bool {
    let cp = c as u32;
    MARK_BLOCKS.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp))
}

/// Normalise a single raw word into its token form.
///
/// One decompose-and-fold pass turns "Café" into "cafe": NFD splits accents
/// off their base letters, the detached marks are dropped, and the rest is
/// case-folded char by char. Punctuation clinging to the edges is then
/// stripped and whitespace runs squeezed to a single space. Internal
/// punctuation survives: "don't" and "co-op" stay intact.
pub fn normalize_token(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    for c in raw.nfd() {
        if nonspacing_mark(c) || c.is_control() {
            continue;
        }
        folded.extend(c.to_lowercase());
    }

    let core = folded.trim_matches(|c: char| !c.is_alphanumeric());
    let mut token = String::with_capacity(core.len());
    let mut pending_gap = false;
    for c in core.chars() {
        if c.is_whitespace() {
            pending_gap = true;
            continue;
        }
        if pending_gap && !token.is_empty() {
            token.push(' ');
        }
        pending_gap = false;
        token.push(c);
    }
    token
}

/// Does the token filter drop this normalised form?
fn is_filtered(token: &str) -> bool {
    if token.is_empty() {
        return true;
    }
    if token.len() < 2 && token.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    is_stop_word(token)
}

/// Flattened word with page geometry, mid-normalisation.
struct StreamWord {
    raw: String,
    page: u32,
    bbox: crate::types::Bbox,
    merged_from: Vec<(u32, crate::types::Bbox)>,
}

/// Normalise an extracted document into its indexable form.
pub fn normalize_document(name: &str, raw: RawDocument) -> Document {
    // Text region edges per page, for the hyphen heuristic. A page with no
    // words gets degenerate margins that can never trigger fusion.
    let margins: Vec<(f32, f32)> = raw
        .pages
        .iter()
        .map(|page| {
            let mut left = f32::INFINITY;
            let mut right = f32::NEG_INFINITY;
            for word in &page.words {
                left = left.min(word.bbox.x0);
                right = right.max(word.bbox.x1);
            }
            (left, right)
        })
        .collect();

    let pages: Vec<PageDims> = raw
        .pages
        .iter()
        .map(|p| PageDims {
            width: p.width,
            height: p.height,
        })
        .collect();

    // Flatten to one stream; page boundaries stay visible through `page`.
    let mut stream: Vec<StreamWord> = Vec::new();
    for (page_idx, page) in raw.pages.into_iter().enumerate() {
        for word in page.words {
            stream.push(StreamWord {
                raw: word.text,
                page: page_idx as u32,
                bbox: word.bbox,
                merged_from: Vec::new(),
            });
        }
    }

    // De-hyphenation pass. Walk forward, fusing at most one continuation per
    // word; a fused word can itself end in a hyphen again (rare but legal).
    let mut fused: Vec<StreamWord> = Vec::with_capacity(stream.len());
    let mut iter = stream.into_iter().peekable();
    while let Some(mut word) = iter.next() {
        loop {
            let Some(next) = iter.peek() else { break };
            if !should_fuse(&word, next, &margins) {
                break;
            }
            let next = iter.next().expect("peeked word exists");
            let trimmed = word.raw.trim_end();
            let stem = &trimmed[..trimmed.len() - 1];
            let mut merged = if word.merged_from.is_empty() {
                vec![(word.page, word.bbox)]
            } else {
                word.merged_from
            };
            merged.push((next.page, next.bbox));
            word = StreamWord {
                raw: format!("{}{}", stem, next.raw),
                page: word.page,
                bbox: word.bbox,
                merged_from: merged,
            };
        }
        fused.push(word);
    }

    // Tokenise, filter, and build the dense map.
    let mut words: Vec<Word> = Vec::with_capacity(fused.len());
    let mut token_map: Vec<u32> = Vec::new();
    for stream_word in fused {
        let token = normalize_token(&stream_word.raw);
        let token = if is_filtered(&token) {
            String::new()
        } else {
            token
        };
        if !token.is_empty() {
            token_map.push(words.len() as u32);
        }
        words.push(Word {
            raw: stream_word.raw,
            token,
            page: stream_word.page,
            bbox: stream_word.bbox,
            merged_from: stream_word.merged_from,
        });
    }

    Document {
        name: name.to_string(),
        pages,
        words,
        token_map,
    }
}

/// Hyphen-fusion test: `word` ends in a visible hyphen at its page's right
/// margin and `next` starts at the left margin of the same or the next page.
fn should_fuse(word: &StreamWord, next: &StreamWord, margins: &[(f32, f32)]) -> bool {
    let trimmed = word.raw.trim_end();
    if !trimmed.ends_with('-') || trimmed.len() < 2 {
        return false;
    }
    if next.page != word.page && next.page != word.page + 1 {
        return false;
    }
    let (_, right) = margins[word.page as usize];
    let (left, _) = margins[next.page as usize];
    if !right.is_finite() || !left.is_finite() {
        return false;
    }
    let ends_at_margin = right - word.bbox.x1 <= MARGIN_EPS;
    let starts_at_margin = next.bbox.x0 - left <= MARGIN_EPS;
    // On the same page the continuation must actually be a new line.
    let wraps = next.page != word.page || next.bbox.y_mid() < word.bbox.y0;
    ends_at_margin && starts_at_margin && wraps
}
