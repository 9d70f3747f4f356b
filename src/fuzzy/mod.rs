// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Rewrite-tolerant seed expansion.
//!
//! Light paraphrase ("method" to "methods", a typo, a changed inflection)
//! kills an exact n-gram dead. Fuzzy mode answers with a token equivalence
//! map built once per run from the reference vocabulary: each target token
//! expands to the reference tokens within Levenshtein distance 1 and length
//! difference at most 1, and the seed scan fingerprints the resulting n-gram
//! variants as well.
//!
//! Fan-out is the hazard. Variants are the Cartesian product of positional
//! alternatives, so a window of promiscuous tokens could explode; the
//! product is enumerated in a fixed odometer order and capped at
//! `MAX_VARIANTS` per n-gram. On text where no token has a near neighbour,
//! fuzzy mode degenerates to exact mode and produces identical output.

mod edits;

pub use edits::within_edit_distance;

use std::collections::{BTreeMap, BTreeSet};

use crate::fingerprint::fingerprint;
use crate::types::Document;

/// Hard cap on fingerprint variants emitted per n-gram.
pub const MAX_VARIANTS: usize = 8;

/// The reference-vocabulary equivalence map, bucketed by token length so a
/// lookup only scans candidates that could possibly be within one edit.
pub struct FuzzyMatcher {
    by_len: BTreeMap<usize, Vec<String>>,
}

impl FuzzyMatcher {
    /// Collect the distinct tokens of every reference that can contribute
    /// n-grams. Bucket order and bucket contents are both sorted, so every
    /// downstream expansion is deterministic.
    pub fn build(docs: &[Document], n: usize) -> Self {
        let mut vocab: BTreeSet<&str> = BTreeSet::new();
        for doc in docs {
            if doc.token_count() < n {
                continue;
            }
            for token in doc.tokens() {
                vocab.insert(token);
            }
        }
        let mut by_len: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for token in vocab {
            by_len
                .entry(token.chars().count())
                .or_default()
                .push(token.to_string());
        }
        Self { by_len }
    }

    /// Reference tokens within one edit and one length unit of `token`,
    /// shortest first, alphabetical within a length.
    pub fn alternatives(&self, token: &str) -> Vec<&str> {
        let len = token.chars().count();
        let mut out = Vec::new();
        for bucket_len in len.saturating_sub(1)..=len + 1 {
            let Some(bucket) = self.by_len.get(&bucket_len) else {
                continue;
            };
            for candidate in bucket {
                if within_edit_distance(token, candidate, 1) {
                    out.push(candidate.as_str());
                }
            }
        }
        out
    }

    /// Fingerprints of every near-miss variant of `window`, identity
    /// excluded, capped at `MAX_VARIANTS`.
    pub fn variant_fingerprints(&self, window: &[&str]) -> Vec<u64> {
        let alts: Vec<Vec<&str>> = window
            .iter()
            .map(|token| {
                let mut list = vec![*token];
                list.extend(
                    self.alternatives(token)
                        .into_iter()
                        .filter(|cand| cand != token),
                );
                list
            })
            .collect();

        if alts.iter().all(|list| list.len() == 1) {
            return Vec::new();
        }

        // Odometer over the alternative lists, rightmost position fastest.
        // Skips the all-original combination (that fingerprint is already
        // covered by the exact scan).
        let mut counters = vec![0usize; alts.len()];
        let mut out = Vec::new();
        'odometer: loop {
            let mut pos = alts.len();
            loop {
                if pos == 0 {
                    break 'odometer;
                }
                pos -= 1;
                counters[pos] += 1;
                if counters[pos] < alts[pos].len() {
                    break;
                }
                counters[pos] = 0;
            }
            let variant: Vec<&str> = counters
                .iter()
                .zip(&alts)
                .map(|(&c, list)| list[c])
                .collect();
            out.push(fingerprint(&variant));
            if out.len() >= MAX_VARIANTS {
                break;
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}
