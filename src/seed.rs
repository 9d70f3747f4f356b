// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Phase A: seed detection and clustering.
//!
//! The scan slides an n-token window over the target, fingerprints each
//! window, and collects every posting the index returns (plus fuzzy variants
//! when enabled). The target position space is split into one contiguous
//! chunk per worker; workers share nothing but the read-only index, and the
//! merged hit list is sorted before clustering, so thread scheduling cannot
//! change the output.
//!
//! Clustering walks each reference's hits in ascending target order and
//! grows diagonal runs: a hit joins a block when both its target and
//! reference gaps are within `merge_gap + n` and the reference position does
//! not regress. Several blocks can be open at once (two copies of the same
//! boilerplate in one reference, say); an eligible hit goes to the block
//! whose `t_end` it sits closest to, ties to the earlier block. Closed
//! blocks spanning fewer than n target words are noise and are dropped.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::fingerprint::fingerprint;
use crate::fuzzy::FuzzyMatcher;
use crate::index::IndexStore;
use crate::types::{CandidateBlock, Document, Phase, Progress, ProgressSink, SeedHit};

/// Cancel poll stride within one scan partition.
const CANCEL_STRIDE: usize = 512;

/// Scan the target against the index, in parallel, and return the merged
/// hit list sorted by (ref_doc, target_start, ref_start).
///
/// Returns whatever was collected when the cancel flag goes up; the caller
/// is responsible for turning a raised flag into a `Cancelled` outcome.
pub fn scan_seeds(
    target: &Document,
    index: &IndexStore,
    fuzzy: Option<&FuzzyMatcher>,
    progress: ProgressSink,
    cancel: &AtomicBool,
) -> Vec<SeedHit> {
    let n = index.seed_size();
    let tokens = target.tokens();
    if tokens.len() < n {
        return Vec::new();
    }
    let total = tokens.len() - n + 1;
    let workers = rayon::current_num_threads().max(1);
    let chunk = total.div_ceil(workers);
    let finished = AtomicUsize::new(0);

    let partitions: Vec<Vec<SeedHit>> = (0..workers)
        .into_par_iter()
        .map(|w| {
            let start = w * chunk;
            let end = total.min(start + chunk);
            let mut out = Vec::new();
            if start >= end || cancel.load(Ordering::Relaxed) {
                return out;
            }
            for (offset, i) in (start..end).enumerate() {
                if offset % CANCEL_STRIDE == 0 && cancel.load(Ordering::Relaxed) {
                    return out;
                }
                let window = &tokens[i..i + n];
                let exact_fp = fingerprint(window);
                for posting in index.lookup(exact_fp) {
                    out.push(SeedHit {
                        ref_doc: posting.doc,
                        target_start: i as u32,
                        ref_start: posting.pos,
                    });
                }
                if let Some(matcher) = fuzzy {
                    for variant_fp in matcher.variant_fingerprints(window) {
                        if variant_fp == exact_fp {
                            continue;
                        }
                        for posting in index.lookup(variant_fp) {
                            out.push(SeedHit {
                                ref_doc: posting.doc,
                                target_start: i as u32,
                                ref_start: posting.pos,
                            });
                        }
                    }
                }
            }
            let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
            progress(Progress {
                phase: Phase::Compare,
                current: done as u64,
                total: workers as u64,
                message: format!("scanned partition {done}/{workers}"),
            });
            out
        })
        .collect();

    let mut hits: Vec<SeedHit> = partitions.into_iter().flatten().collect();
    hits.sort_unstable();
    hits.dedup();
    hits
}

/// Cluster sorted hits into gap-tolerant diagonal candidate blocks.
pub fn cluster_hits(hits: &[SeedHit], n: usize, merge_gap: usize) -> Vec<CandidateBlock> {
    let gap = (merge_gap + n) as u32;
    let span = n as u32;
    let mut blocks: Vec<CandidateBlock> = Vec::new();

    let mut open: Vec<CandidateBlock> = Vec::new();
    let mut current_ref: Option<u32> = None;
    for hit in hits {
        if current_ref != Some(hit.ref_doc) {
            blocks.append(&mut open);
            current_ref = Some(hit.ref_doc);
        }

        // Hits arrive in ascending target order, so a block the current hit
        // cannot reach is closed for good.
        let mut still_open = Vec::with_capacity(open.len());
        for block in open.drain(..) {
            if hit.target_start.saturating_sub(block.t_end) > gap {
                blocks.push(block);
            } else {
                still_open.push(block);
            }
        }
        open = still_open;

        // Eligible block with t_end nearest the hit; ties to the earlier
        // block (lower index, since blocks open in target order).
        let mut best: Option<(usize, u32)> = None;
        for (idx, block) in open.iter().enumerate() {
            let target_ok = hit.target_start.saturating_sub(block.t_end) <= gap;
            let ref_ok = hit.ref_start >= block.r_start
                && hit.ref_start.saturating_sub(block.r_end) <= gap;
            if !(target_ok && ref_ok) {
                continue;
            }
            let distance = hit.target_start.abs_diff(block.t_end);
            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((idx, distance)),
            }
        }

        match best {
            Some((idx, _)) => {
                let block = &mut open[idx];
                block.t_end = block.t_end.max(hit.target_start + span - 1);
                block.r_end = block.r_end.max(hit.ref_start + span - 1);
                block.seed_count += 1;
            }
            None => open.push(CandidateBlock {
                ref_doc: hit.ref_doc,
                t_start: hit.target_start,
                t_end: hit.target_start + span - 1,
                r_start: hit.ref_start,
                r_end: hit.ref_start + span - 1,
                seed_count: 1,
            }),
        }
    }
    blocks.append(&mut open);

    blocks.retain(|b| b.t_end - b.t_start + 1 >= span);
    blocks.sort_unstable_by_key(|b| (b.ref_doc, b.t_start, b.r_start));
    blocks
}
