// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The building blocks of a comparison run.
//!
//! These types define how extracted words, documents, seed hits, candidate
//! blocks, and final match records fit together. The comparison pipeline is a
//! funnel: many words become few seed hits, few hits become fewer blocks, and
//! blocks become the handful of match records the caller actually sees.
//!
//! # Invariants (the stuff that breaks if you ignore it)
//!
//! - **Document**: `token_map` is strictly increasing and every mapped word
//!   has a non-empty `token`. Dense token index `i` names the word
//!   `words[token_map[i]]`. Off-by-one here means highlights land on the
//!   wrong line.
//!
//! - **CandidateBlock / MatchRecord**: `t_end >= t_start` and
//!   `r_end >= r_start`, always. Ranges are inclusive dense token indices.
//!
//! - **MatchRecord rectangles**: sorted by (page, y0, x0); no rectangle
//!   crosses a page boundary. A de-hyphenated word contributes one rectangle
//!   per fused fragment.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in PDF points. `(x0, y0)` is the lower-left
/// corner, `(x1, y1)` the upper-right, matching PDF page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Bbox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Vertical midpoint, used to decide whether two boxes sit on one line.
    pub fn y_mid(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Bbox) -> Bbox {
        Bbox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDims {
    pub width: f32,
    pub height: f32,
}

/// One word of the original (pre-filter) stream.
///
/// `token` is the normalised form and is empty for words the token filter
/// dropped (stop words, stray digits). Filtered words stay in the stream so
/// match ranges can be projected back onto contiguous page geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Original glyph string as extracted (de-hyphenation already applied).
    pub raw: String,
    /// Normalised token, or `""` when the filter removed it.
    pub token: String,
    /// 0-based page index.
    pub page: u32,
    /// Bounding box on `page`.
    pub bbox: Bbox,
    /// Fragments fused by de-hyphenation, as `(page, bbox)` pairs. Empty for
    /// ordinary words; when non-empty these replace `bbox` for highlighting.
    pub merged_from: Vec<(u32, Bbox)>,
}

impl Word {
    /// The rectangles this word occupies on screen, one per fused fragment.
    pub fn fragments(&self) -> Vec<(u32, Bbox)> {
        if self.merged_from.is_empty() {
            vec![(self.page, self.bbox)]
        } else {
            self.merged_from.clone()
        }
    }
}

/// An ingested, normalised document.
///
/// `words` is the full pre-filter stream in reading order. `token_map` lists
/// the surviving words densely: dense token index `i` (the unit all seed and
/// alignment positions are expressed in) maps to `words[token_map[i]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub pages: Vec<PageDims>,
    pub words: Vec<Word>,
    pub token_map: Vec<u32>,
}

impl Document {
    /// Number of surviving (indexable) tokens.
    pub fn token_count(&self) -> usize {
        self.token_map.len()
    }

    /// The normalised token at dense index `i`.
    pub fn token(&self, i: usize) -> &str {
        &self.words[self.token_map[i] as usize].token
    }

    /// All surviving tokens in dense order.
    pub fn tokens(&self) -> Vec<&str> {
        self.token_map
            .iter()
            .map(|&w| self.words[w as usize].token.as_str())
            .collect()
    }

    /// The original-stream word backing dense index `i`.
    pub fn word_at(&self, i: usize) -> &Word {
        &self.words[self.token_map[i] as usize]
    }
}

/// One posting of the inverted index: fingerprint seen in document `doc` at
/// dense token position `pos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Posting {
    pub doc: u32,
    pub pos: u32,
}

/// A single fingerprint collision between the target and one reference.
/// Transient: produced by the seed scan, consumed by clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeedHit {
    pub ref_doc: u32,
    pub target_start: u32,
    pub ref_start: u32,
}

/// A diagonally coherent, gap-tolerant cluster of seed hits against one
/// reference. Ranges are inclusive dense token indices. Transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateBlock {
    pub ref_doc: u32,
    pub t_start: u32,
    pub t_end: u32,
    pub r_start: u32,
    pub r_end: u32,
    pub seed_count: u32,
}

/// A highlight rectangle pinned to a single page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRect {
    pub page: u32,
    pub rect: Bbox,
}

/// The durable output of a comparison: one refined overlap between the
/// target and one reference, with highlight-ready geometry for both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Stable identifier derived from (ref_doc, t_start, r_start, score).
    pub match_id: u64,
    pub ref_doc: u32,
    /// Refined target range, inclusive dense token indices.
    pub t_start: u32,
    pub t_end: u32,
    /// Refined reference range, inclusive dense token indices.
    pub r_start: u32,
    pub r_end: u32,
    /// Raw alignment score (match +2, mismatch -1, gap -1, zero floor).
    pub score: i32,
    /// `score / (2 * min(slice lengths))`, clamped to [0, 1].
    pub confidence: f32,
    /// Per-page highlight rectangles over the target words.
    pub target_rects: Vec<PageRect>,
    /// Per-page highlight rectangles over the reference words.
    pub ref_rects: Vec<PageRect>,
}

/// Seed matching mode for Phase A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    /// Exact fingerprint lookups only.
    Exact,
    /// Additionally expand each n-gram through the token equivalence map.
    Fuzzy,
}

/// Tunables for a comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareParams {
    /// N-gram width for seeding. Must match the index and be at least 2.
    pub seed_size: usize,
    /// Maximum token gap bridged when clustering adjacent seed hits.
    pub merge_gap: usize,
    pub mode: MatchMode,
    /// Refine candidate blocks with Smith-Waterman. When off, block bounds
    /// are kept and scored by positional token equality.
    pub smith_waterman: bool,
    /// Extra context tokens fed to the aligner on each side of a block.
    pub context_lookahead: usize,
}

impl Default for CompareParams {
    fn default() -> Self {
        Self {
            seed_size: 5,
            merge_gap: 3,
            mode: MatchMode::Exact,
            smith_waterman: true,
            context_lookahead: 10,
        }
    }
}

impl CompareParams {
    /// Reject parameter combinations the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.seed_size < 2 {
            return Err(crate::Error::InvalidParam(format!(
                "seed_size must be at least 2, got {}",
                self.seed_size
            )));
        }
        Ok(())
    }
}

/// A reference document the pipeline had to give up on, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedDoc {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a comparison run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResult {
    /// Match records sorted by (ref_doc, t_start, r_start).
    pub matches: Vec<MatchRecord>,
    /// Per-reference similarity: distinct matched target tokens divided by
    /// the target's surviving token count. Overlapping matches count a token
    /// once per reference; the same token may count for several references.
    pub per_ref_score: BTreeMap<u32, f32>,
    /// Reference names, indexed by `ref_doc`.
    pub ref_names: Vec<String>,
    /// Deterministic per-reference highlight colours (`#rrggbb`).
    pub ref_colors: Vec<String>,
    /// Surviving token count of the target.
    pub target_word_count: usize,
    /// Documents skipped during ingestion.
    pub skipped: Vec<SkippedDoc>,
}

/// Pipeline phase, for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Index,
    Compare,
    Align,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Index => "index",
            Phase::Compare => "compare",
            Phase::Align => "align",
            Phase::Done => "done",
        }
    }
}

/// One progress event. Long phases emit one event per unit of work
/// (document, scan partition, candidate block).
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub phase: Phase,
    pub current: u64,
    pub total: u64,
    pub message: String,
}

/// Progress callback. Workers report from parallel sections, hence `Sync`.
pub type ProgressSink<'a> = &'a (dyn Fn(Progress) + Sync);
