// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Phase B: Smith-Waterman refinement.
//!
//! A candidate block says "something around here matches". The aligner pins
//! down exactly what: it slices both documents around the block (plus a
//! little context), runs a local alignment over token equality (match +2,
//! mismatch -1, gap -1, zero floor), and keeps the result only if the
//! confidence clears the bar.
//!
//! # Memory
//!
//! Identity-sized blocks are routine (compare a document against itself and
//! Phase A hands back one block covering everything), so the classic
//! full-matrix traceback is off the table. Instead: a rolling-row forward
//! pass finds the best score and its end cell in O(cols) memory, and the
//! same kernel over the reversed prefixes recovers the start cell. Twice the
//! arithmetic, none of the quadratic memory, same answer.
//!
//! # Vectorisation
//!
//! The row update is split into a diagonal/up pass with no loop-carried
//! dependency (the SIMD-friendly part, dispatched through `multiversion`)
//! and a sequential left-gap resolution. Every dispatch target runs the
//! identical integer arithmetic, so the chosen target can never change the
//! returned ranges or scores.
//!
//! Tokens are interned to dense u32 ids before alignment; the kernel
//! compares integers, never strings.

use std::collections::HashMap;

use crate::error::Error;
use crate::fingerprint::stable_hash;
use crate::types::{
    Bbox, CandidateBlock, CompareParams, Document, MatchRecord, PageRect,
};

const MATCH_SCORE: i32 = 2;
const MISMATCH_SCORE: i32 = -1;
const GAP_SCORE: i32 = -1;

/// Minimum confidence for a refined alignment to survive.
pub const MIN_CONFIDENCE: f32 = 0.4;

/// An alignment span in slice-relative inclusive indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentSpan {
    pub t_start: usize,
    pub t_end: usize,
    pub r_start: usize,
    pub r_end: usize,
    pub score: i32,
}

/// Diagonal/up candidates for one row. No loop-carried dependency, so the
/// compiler is free to vectorise; `multiversion` picks the widest target the
/// machine supports.
#[multiversion::multiversion(targets = "simd")]
fn fill_row_diag_up(token: u32, row_refs: &[u32], prev: &[i32], out: &mut [i32]) {
    for j in 0..row_refs.len() {
        let subst = if row_refs[j] == token {
            MATCH_SCORE
        } else {
            MISMATCH_SCORE
        };
        out[j] = (prev[j] + subst).max(prev[j + 1] + GAP_SCORE);
    }
}

/// One Smith-Waterman sweep over interned tokens. Returns the best score
/// and its inclusive cell, or `None` when nothing scores above zero.
///
/// Equal scores break deterministically: the forward pass keeps the
/// earliest cell (lowest row, then column) as the alignment end, while the
/// reverse pass keeps the latest, which reaches the farthest-back start,
/// the same cell a full traceback to the first zero would settle on.
fn sw_best(a: &[u32], b: &[u32], prefer_latest: bool) -> Option<(i32, usize, usize)> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let cols = b.len();
    let mut prev = vec![0i32; cols + 1];
    let mut cur = vec![0i32; cols + 1];
    let mut diag_up = vec![0i32; cols];

    let mut best = (0i32, 0usize, 0usize);
    for (i, &token) in a.iter().enumerate() {
        fill_row_diag_up(token, b, &prev, &mut diag_up);
        cur[0] = 0;
        for j in 0..cols {
            let left = cur[j] + GAP_SCORE;
            let val = diag_up[j].max(left).max(0);
            cur[j + 1] = val;
            if val > best.0 || (prefer_latest && val == best.0 && val > 0) {
                best = (val, i, j);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    (best.0 > 0).then_some(best)
}

/// Full local alignment span over interned tokens: forward pass for the end
/// cell, reversed pass over the consumed prefixes for the start cell.
pub fn smith_waterman_span(t: &[u32], r: &[u32]) -> Result<Option<AlignmentSpan>, Error> {
    let Some((score, t_end, r_end)) = sw_best(t, r, false) else {
        return Ok(None);
    };
    let t_rev: Vec<u32> = t[..=t_end].iter().rev().copied().collect();
    let r_rev: Vec<u32> = r[..=r_end].iter().rev().copied().collect();
    let Some((rev_score, rev_t, rev_r)) = sw_best(&t_rev, &r_rev, true) else {
        return Err(Error::Internal(
            "reverse alignment lost a positive-score path".into(),
        ));
    };
    if rev_score != score {
        return Err(Error::Internal(format!(
            "alignment score drifted between passes: {score} vs {rev_score}"
        )));
    }
    Ok(Some(AlignmentSpan {
        t_start: t_end - rev_t,
        t_end,
        r_start: r_end - rev_r,
        r_end,
        score,
    }))
}

/// Intern two token slices into one dense id space.
fn intern<'a>(t: &[&'a str], r: &[&'a str]) -> (Vec<u32>, Vec<u32>) {
    fn assign<'a>(ids: &mut HashMap<&'a str, u32>, token: &'a str) -> u32 {
        let next = ids.len() as u32;
        *ids.entry(token).or_insert(next)
    }
    let mut ids: HashMap<&'a str, u32> = HashMap::new();
    let t_ids = t.iter().map(|tok| assign(&mut ids, tok)).collect();
    let r_ids = r.iter().map(|tok| assign(&mut ids, tok)).collect();
    (t_ids, r_ids)
}

/// Block-bounds scoring for runs with Smith-Waterman disabled: positional
/// token equality over the paired span, zero-floored.
fn positional_score(t: &[u32], r: &[u32]) -> i32 {
    let paired = t.len().min(r.len());
    let mut score = 0i32;
    for k in 0..paired {
        score += if t[k] == r[k] {
            MATCH_SCORE
        } else {
            MISMATCH_SCORE
        };
    }
    score.max(0)
}

/// Refine one candidate block into a match record, or drop it.
pub fn refine_block(
    target: &Document,
    reference: &Document,
    block: &CandidateBlock,
    params: &CompareParams,
) -> Result<Option<MatchRecord>, Error> {
    let t_len = target.token_count();
    let r_len = reference.token_count();
    if t_len == 0 || r_len == 0 {
        return Ok(None);
    }
    if block.t_end as usize >= t_len || block.r_end as usize >= r_len {
        return Err(Error::Internal(format!(
            "candidate block out of range: t {}..{} of {t_len}, r {}..{} of {r_len}",
            block.t_start, block.t_end, block.r_start, block.r_end
        )));
    }

    let lookahead = params.context_lookahead;
    let (t_lo, t_hi, r_lo, r_hi) = if params.smith_waterman {
        (
            (block.t_start as usize).saturating_sub(lookahead),
            (block.t_end as usize + lookahead).min(t_len - 1),
            (block.r_start as usize).saturating_sub(lookahead),
            (block.r_end as usize + lookahead).min(r_len - 1),
        )
    } else {
        (
            block.t_start as usize,
            block.t_end as usize,
            block.r_start as usize,
            block.r_end as usize,
        )
    };

    let t_tokens = target.tokens();
    let r_tokens = reference.tokens();
    let (t_ids, r_ids) = intern(&t_tokens[t_lo..=t_hi], &r_tokens[r_lo..=r_hi]);

    let (span, score) = if params.smith_waterman {
        match smith_waterman_span(&t_ids, &r_ids)? {
            Some(span) => (
                (
                    t_lo + span.t_start,
                    t_lo + span.t_end,
                    r_lo + span.r_start,
                    r_lo + span.r_end,
                ),
                span.score,
            ),
            None => return Ok(None),
        }
    } else {
        let score = positional_score(&t_ids, &r_ids);
        if score == 0 {
            return Ok(None);
        }
        ((t_lo, t_hi, r_lo, r_hi), score)
    };

    let slice_min = t_ids.len().min(r_ids.len());
    let confidence =
        (score as f32 / (2.0 * slice_min as f32)).clamp(0.0, 1.0);

    let (t_start, t_end, r_start, r_end) = span;
    let span_words = t_end - t_start + 1;
    if confidence < MIN_CONFIDENCE || span_words < params.seed_size {
        return Ok(None);
    }

    let target_rects = project_rects(target, t_start, t_end)?;
    let ref_rects = project_rects(reference, r_start, r_end)?;

    let mut id_bytes = Vec::with_capacity(16);
    id_bytes.extend_from_slice(&block.ref_doc.to_le_bytes());
    id_bytes.extend_from_slice(&(t_start as u32).to_le_bytes());
    id_bytes.extend_from_slice(&(r_start as u32).to_le_bytes());
    id_bytes.extend_from_slice(&score.to_le_bytes());

    Ok(Some(MatchRecord {
        match_id: stable_hash(&id_bytes),
        ref_doc: block.ref_doc,
        t_start: t_start as u32,
        t_end: t_end as u32,
        r_start: r_start as u32,
        r_end: r_end as u32,
        score,
        confidence,
        target_rects,
        ref_rects,
    }))
}

/// Project a dense token range back onto page geometry.
///
/// The range endpoints map to original word positions; every original word
/// between them (filtered ones included, so highlights stay contiguous)
/// contributes its fragments. Adjacent same-page boxes whose vertical
/// midpoints sit within half a line height are unioned into one rectangle.
pub fn project_rects(doc: &Document, t_start: usize, t_end: usize) -> Result<Vec<PageRect>, Error> {
    if t_end < t_start || t_end >= doc.token_map.len() {
        return Err(Error::Internal(format!(
            "rectangle projection over bad range {t_start}..{t_end} of {}",
            doc.token_map.len()
        )));
    }
    let first = doc.token_map[t_start] as usize;
    let last = doc.token_map[t_end] as usize;

    let mut rects: Vec<PageRect> = Vec::new();
    for word in &doc.words[first..=last] {
        for (page, bbox) in word.fragments() {
            match rects.last_mut() {
                Some(open) if open.page == page && same_line(&open.rect, &bbox) => {
                    open.rect = open.rect.union(&bbox);
                }
                _ => rects.push(PageRect { page, rect: bbox }),
            }
        }
    }

    rects.sort_by(|a, b| {
        (a.page, a.rect.y0, a.rect.x0)
            .partial_cmp(&(b.page, b.rect.y0, b.rect.x0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(rects)
}

fn same_line(a: &Bbox, b: &Bbox) -> bool {
    let line_height = a.height().max(b.height());
    (a.y_mid() - b.y_mid()).abs() <= line_height / 2.0
}
