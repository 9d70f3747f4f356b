// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! CLI definitions for the pdfcompare command-line interface.
//!
//! Three subcommands: `compare` to run a target against a reference pool,
//! `index` to warm the document cache and report pool statistics, and
//! `inspect` to examine a cache file. Comparison tunables mirror the
//! library's `CompareParams` one for one.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pdfcompare",
    about = "Detect and localise textual overlap between PDFs",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare a target PDF against one or more reference PDFs
    Compare {
        /// The document under scrutiny
        #[arg(short, long)]
        target: PathBuf,

        /// Reference documents to compare against
        #[arg(required = true)]
        refs: Vec<PathBuf>,

        /// Seed n-gram width (at least 2)
        #[arg(long, default_value = "5")]
        seed_size: usize,

        /// Maximum token gap bridged when clustering seed hits
        #[arg(long, default_value = "3")]
        merge_gap: usize,

        /// Expand seeds through the token equivalence map (rewrite tolerance)
        #[arg(long)]
        fuzzy: bool,

        /// Skip Smith-Waterman refinement and keep raw block bounds
        #[arg(long)]
        no_smith_waterman: bool,

        /// Context tokens fed to the aligner on each side of a block
        #[arg(long, default_value = "10")]
        lookahead: usize,

        /// Cache directory (defaults to ~/.pdfcompare/index_cache)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Disable the document cache entirely
        #[arg(long)]
        no_cache: bool,

        /// Write the full result as JSON to this path
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Ingest references, warm the cache, and print pool statistics
    Index {
        /// Reference documents to ingest
        #[arg(required = true)]
        refs: Vec<PathBuf>,

        /// Seed n-gram width (at least 2)
        #[arg(long, default_value = "5")]
        seed_size: usize,

        /// Cache directory (defaults to ~/.pdfcompare/index_cache)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Disable the document cache entirely
        #[arg(long)]
        no_cache: bool,
    },

    /// Inspect a cache entry (.dat file)
    Inspect {
        /// Path to the cache file
        file: PathBuf,
    },
}
