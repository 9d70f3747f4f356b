// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the comparison pipeline.
//!
//! Three tiers, handled very differently:
//!
//! - Input errors (`NoTarget`, `EmptyPool`, `InvalidParam`) are reported
//!   before any work starts.
//! - Per-document failures (unreadable or encrypted PDFs, corrupt cache
//!   entries) never surface here. The offending document is logged, skipped,
//!   and reported in the result; the pipeline keeps going.
//! - `Internal` means an invariant broke. No silent fallback: if the word
//!   geometry or the alignment bookkeeping is wrong, we want to hear about
//!   it, not paper over it.
//!
//! `Cancelled` is a distinct outcome rather than a failure; callers that set
//! the cancel flag should expect it and discard partial state.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The target document could not be read at all.
    #[error("no readable target document: {0}")]
    NoTarget(String),

    /// The reference pool is empty, or every reference was skipped.
    #[error("reference pool is empty")]
    EmptyPool,

    /// A parameter failed validation before any work started.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// The cooperative cancel flag was set; partial results were discarded.
    #[error("comparison cancelled")]
    Cancelled,

    /// An internal invariant was violated. Always a bug.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
