// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Orchestration: ingest, index, seed, align, finalise.
//!
//! The pipeline owns nothing global. The extractor and the cache directory
//! are injected at construction, every run's state is passed explicitly, and
//! all intermediate products are sorted by stable keys before use, so a run
//! is deterministic for fixed inputs regardless of how rayon schedules it.
//!
//! Ingestion failures degrade per document: an unreadable reference is
//! logged, recorded in `RefPool::skipped`, and the run continues with the
//! rest. Only an unusable target or a fully-skipped pool aborts.
//!
//! Cancellation is cooperative. The flag is polled between reference
//! documents, between scan partitions, and between candidate blocks; once
//! observed, workers drain, partial results are dropped, and the call
//! returns `Error::Cancelled`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::{info, warn};
use rayon::prelude::*;

use crate::align::refine_block;
use crate::cache::CacheStore;
use crate::error::{Error, Result};
use crate::extract::{ExtractError, WordExtractor};
use crate::fingerprint::stable_hash;
use crate::fuzzy::FuzzyMatcher;
use crate::index::IndexStore;
use crate::normalize::normalize_document;
use crate::seed::{cluster_hits, scan_seeds};
use crate::types::{
    CompareParams, CompareResult, Document, MatchMode, MatchRecord, Phase, Progress, ProgressSink,
    SkippedDoc,
};

/// The indexed reference pool a comparison runs against. Build once, compare
/// many targets.
pub struct RefPool {
    pub index: IndexStore,
    pub docs: Vec<Document>,
    pub skipped: Vec<SkippedDoc>,
}

pub struct Pipeline<E> {
    extractor: E,
    cache: Option<CacheStore>,
}

impl<E: WordExtractor> Pipeline<E> {
    /// A pipeline with an explicit cache directory, or no cache at all.
    pub fn new(extractor: E, cache_dir: Option<PathBuf>) -> Self {
        Self {
            extractor,
            cache: cache_dir.map(CacheStore::new),
        }
    }

    /// A pipeline caching under `~/.pdfcompare/index_cache`. Falls back to
    /// no caching when no home directory is discoverable.
    pub fn with_default_cache(extractor: E) -> Self {
        Self::new(extractor, CacheStore::default_dir())
    }

    /// Cache probe, then extract + normalise + cache store.
    fn ingest(&self, path: &Path) -> std::result::Result<Document, ExtractError> {
        let key = self.cache.as_ref().and_then(|_| CacheStore::content_key(path));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(doc) = cache.load(key) {
                return Ok(doc);
            }
        }
        let raw = self.extractor.extract_words(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.to_string_lossy().into_owned(), |n| {
                n.to_string_lossy().into_owned()
            });
        let doc = normalize_document(&name, raw);
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            cache.store(key, &doc);
        }
        Ok(doc)
    }

    /// Ingest and index the reference pool. Parallel across references,
    /// serial within each document.
    pub fn build_index(
        &self,
        ref_paths: &[PathBuf],
        n: usize,
        progress: ProgressSink,
        cancel: &AtomicBool,
    ) -> Result<RefPool> {
        if n < 2 {
            return Err(Error::InvalidParam(format!(
                "seed_size must be at least 2, got {n}"
            )));
        }
        if ref_paths.is_empty() {
            return Err(Error::EmptyPool);
        }

        let total = ref_paths.len() as u64;
        let finished = AtomicUsize::new(0);
        let outcomes: Vec<Option<std::result::Result<Document, ExtractError>>> = ref_paths
            .par_iter()
            .map(|path| {
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
                let outcome = self.ingest(path);
                let done = finished.fetch_add(1, Ordering::Relaxed) as u64 + 1;
                progress(Progress {
                    phase: Phase::Index,
                    current: done,
                    total,
                    message: path.display().to_string(),
                });
                Some(outcome)
            })
            .collect();

        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        let mut docs = Vec::new();
        let mut skipped = Vec::new();
        for (path, outcome) in ref_paths.iter().zip(outcomes) {
            match outcome.expect("no outcome without cancellation") {
                Ok(doc) => docs.push(doc),
                Err(e) => {
                    warn!("skipping reference {}: {e}", path.display());
                    skipped.push(SkippedDoc {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        if docs.is_empty() {
            return Err(Error::EmptyPool);
        }

        let mut index = IndexStore::new(n);
        for (doc_id, doc) in docs.iter().enumerate() {
            index.add_document(doc_id as u32, doc);
        }
        info!(
            "indexed {} references: {} postings over {} distinct {}-grams (~{} KiB)",
            docs.len(),
            index.posting_count(),
            index.term_count(),
            n,
            index.approx_memory() / 1024
        );

        Ok(RefPool {
            index,
            docs,
            skipped,
        })
    }

    /// Compare one target against an indexed pool.
    pub fn compare(
        &self,
        target_path: &Path,
        pool: &RefPool,
        params: &CompareParams,
        progress: ProgressSink,
        cancel: &AtomicBool,
    ) -> Result<CompareResult> {
        params.validate()?;
        if params.seed_size != pool.index.seed_size() {
            return Err(Error::InvalidParam(format!(
                "seed_size {} does not match the index ({})",
                params.seed_size,
                pool.index.seed_size()
            )));
        }
        if pool.docs.is_empty() {
            return Err(Error::EmptyPool);
        }

        let target = self
            .ingest(target_path)
            .map_err(|e| Error::NoTarget(e.to_string()))?;
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        // Phase A: seed scan and clustering.
        let matcher = (params.mode == MatchMode::Fuzzy)
            .then(|| FuzzyMatcher::build(&pool.docs, params.seed_size));
        let hits = scan_seeds(&target, &pool.index, matcher.as_ref(), progress, cancel);
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        let blocks = cluster_hits(&hits, params.seed_size, params.merge_gap);
        info!(
            "phase A: {} seed hits clustered into {} candidate blocks",
            hits.len(),
            blocks.len()
        );

        // Phase B: refine each block, in parallel.
        let total_blocks = blocks.len() as u64;
        let refined_count = AtomicUsize::new(0);
        let refined: Vec<Result<Option<MatchRecord>>> = blocks
            .par_iter()
            .map(|block| {
                if cancel.load(Ordering::Relaxed) {
                    return Ok(None);
                }
                let outcome = refine_block(
                    &target,
                    &pool.docs[block.ref_doc as usize],
                    block,
                    params,
                );
                let done = refined_count.fetch_add(1, Ordering::Relaxed) as u64 + 1;
                progress(Progress {
                    phase: Phase::Align,
                    current: done,
                    total: total_blocks,
                    message: format!("aligned block {done}/{total_blocks}"),
                });
                outcome
            })
            .collect();

        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        let mut matches = Vec::new();
        for outcome in refined {
            if let Some(record) = outcome? {
                matches.push(record);
            }
        }

        // Finalise: stable order, similarity scores, colours.
        matches.sort_by_key(|m| (m.ref_doc, m.t_start, m.r_start, m.match_id));
        let result = finalise(&target, pool, matches);
        progress(Progress {
            phase: Phase::Done,
            current: 1,
            total: 1,
            message: format!("{} matches", result.matches.len()),
        });
        Ok(result)
    }
}

/// Similarity scores, names, and colours for the final result.
fn finalise(target: &Document, pool: &RefPool, matches: Vec<MatchRecord>) -> CompareResult {
    let token_count = target.token_count();
    let mut per_ref_score = std::collections::BTreeMap::new();
    for doc_id in 0..pool.docs.len() as u32 {
        per_ref_score.insert(doc_id, 0.0f32);
    }

    // Distinct matched target tokens per reference; overlapping matches
    // count a token once per reference.
    let mut current_ref: Option<u32> = None;
    let mut covered = vec![false; token_count];
    let flush = |ref_doc: Option<u32>,
                 covered: &mut Vec<bool>,
                 scores: &mut std::collections::BTreeMap<u32, f32>| {
        if let Some(doc_id) = ref_doc {
            let matched = covered.iter().filter(|&&c| c).count();
            let score = if token_count == 0 {
                0.0
            } else {
                matched as f32 / token_count as f32
            };
            scores.insert(doc_id, score);
            covered.fill(false);
        }
    };
    for record in &matches {
        if current_ref != Some(record.ref_doc) {
            flush(current_ref, &mut covered, &mut per_ref_score);
            current_ref = Some(record.ref_doc);
        }
        for idx in record.t_start..=record.t_end {
            covered[idx as usize] = true;
        }
    }
    flush(current_ref, &mut covered, &mut per_ref_score);

    let ref_names: Vec<String> = pool.docs.iter().map(|d| d.name.clone()).collect();
    let ref_colors: Vec<String> = ref_names.iter().map(|n| color_for(n)).collect();

    CompareResult {
        matches,
        per_ref_score,
        ref_names,
        ref_colors,
        target_word_count: token_count,
        skipped: pool.skipped.clone(),
    }
}

/// Deterministic highlight colour for a reference: hue from the name hash,
/// fixed saturation and lightness so every source stays legible.
pub fn color_for(name: &str) -> String {
    let hue = (stable_hash(name.as_bytes()) % 360) as f32;
    let (r, g, b) = hsl_to_rgb(hue, 0.62, 0.52);
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    (
        ((r1 + m) * 255.0).round() as u8,
        ((g1 + m) * 255.0).round() as u8,
        ((b1 + m) * 255.0).round() as u8,
    )
}
