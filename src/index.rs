// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The inverted n-gram index over the reference pool.
//!
//! One map: fingerprint of n consecutive tokens to the list of
//! `(reference doc, start position)` postings. Built once per run, then
//! treated as read-only while the seed scan and the aligner hammer it from
//! every worker thread; no interior mutability, no locks.
//!
//! # Invariants
//!
//! 1. **POSTINGS_SORTED**: every posting list is sorted by (doc, pos).
//!    `add_document` appends in ascending order per document and documents
//!    are added in ascending id order, so this holds by construction.
//! 2. **SEED_SIZE_FIXED**: `n` is set at construction and never changes; an
//!    index answers lookups only for the window width it was built with.

use std::collections::HashMap;

use crate::fingerprint::fingerprint;
use crate::types::{Document, Posting};

#[derive(Debug)]
pub struct IndexStore {
    n: usize,
    map: HashMap<u64, Vec<Posting>>,
    doc_count: usize,
    posting_count: usize,
}

impl IndexStore {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            map: HashMap::new(),
            doc_count: 0,
            posting_count: 0,
        }
    }

    /// The n-gram width this index was built with.
    pub fn seed_size(&self) -> usize {
        self.n
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    pub fn posting_count(&self) -> usize {
        self.posting_count
    }

    pub fn term_count(&self) -> usize {
        self.map.len()
    }

    /// Index every n-token window of `doc`. A document shorter than `n`
    /// tokens contributes nothing, which is fine.
    pub fn add_document(&mut self, doc_id: u32, doc: &Document) {
        let tokens = doc.tokens();
        self.doc_count += 1;
        if tokens.len() < self.n {
            return;
        }
        for start in 0..=(tokens.len() - self.n) {
            let fp = fingerprint(&tokens[start..start + self.n]);
            self.map.entry(fp).or_default().push(Posting {
                doc: doc_id,
                pos: start as u32,
            });
            self.posting_count += 1;
        }
    }

    /// All postings for a fingerprint; empty slice when unseen.
    pub fn lookup(&self, fp: u64) -> &[Posting] {
        self.map.get(&fp).map_or(&[], Vec::as_slice)
    }

    /// Rough resident size, for display only.
    pub fn approx_memory(&self) -> usize {
        let entry = std::mem::size_of::<u64>() + std::mem::size_of::<Vec<Posting>>();
        self.map.len() * entry + self.posting_count * std::mem::size_of::<Posting>()
    }
}
