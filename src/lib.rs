//! Textual-overlap detection between a target PDF and a pool of references.
//!
//! The comparison runs in two phases over normalised word streams:
//!
//! ```text
//! ┌───────────┐     ┌─────────────┐     ┌────────────┐
//! │ extract   │────▶│ normalize   │────▶│ index      │◀──── cache
//! │ (words +  │     │ (tokens +   │     │ (n-gram →  │      (.dat files,
//! │  bboxes)  │     │  geometry)  │     │  postings) │       content-keyed)
//! └───────────┘     └─────────────┘     └────────────┘
//!                                              │
//!                        target tokens         ▼
//!                   ┌──────────────────▶ seed (Phase A) ──▶ candidate blocks
//!                   │                    fuzzy (optional)         │
//!                   │                                             ▼
//!                   │                                      align (Phase B)
//!                   │                                             │
//!                   └── pipeline ◀── match records + geometry ◀───┘
//! ```
//!
//! Phase A slides an n-token window over the target, looks every fingerprint
//! up in the inverted index, and clusters the hits into diagonal candidate
//! blocks. Phase B refines each block with a Smith-Waterman local alignment
//! and projects the refined ranges back onto page rectangles. Both phases
//! fan out across rayon workers and sort their outputs by stable keys, so a
//! run is deterministic for fixed inputs and parameters.
//!
//! # Usage
//!
//! ```ignore
//! use pdfcompare::{CompareParams, Pipeline, PdfiumExtractor};
//! use std::sync::atomic::AtomicBool;
//!
//! let pipeline = Pipeline::with_default_cache(PdfiumExtractor);
//! let cancel = AtomicBool::new(false);
//! let quiet = |_| {};
//! let pool = pipeline.build_index(&refs, 5, &quiet, &cancel)?;
//! let result = pipeline.compare(&target, &pool, &CompareParams::default(), &quiet, &cancel)?;
//! for m in &result.matches {
//!     println!("{}: target words {}..{} ({:.0}%)", m.ref_doc, m.t_start, m.t_end,
//!              m.confidence * 100.0);
//! }
//! ```

pub mod align;
pub mod cache;
mod error;
pub mod extract;
pub mod fingerprint;
mod fuzzy;
mod index;
mod normalize;
mod pipeline;
mod seed;
mod types;

pub use align::{refine_block, smith_waterman_span, AlignmentSpan, MIN_CONFIDENCE};
pub use error::{Error, Result};
pub use extract::{ExtractError, RawDocument, RawPage, RawWord, WordExtractor};
pub use fingerprint::fingerprint;
pub use fuzzy::{within_edit_distance, FuzzyMatcher, MAX_VARIANTS};
pub use index::IndexStore;
pub use normalize::{is_stop_word, normalize_document, normalize_token};
pub use pipeline::{color_for, Pipeline, RefPool};
pub use seed::{cluster_hits, scan_seeds};
pub use types::{
    Bbox, CandidateBlock, CompareParams, CompareResult, Document, MatchMode, MatchRecord,
    PageDims, PageRect, Phase, Posting, Progress, ProgressSink, SeedHit, SkippedDoc, Word,
};

#[cfg(feature = "pdf")]
pub use extract::PdfiumExtractor;
