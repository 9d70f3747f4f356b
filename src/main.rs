// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! pdfcompare CLI: compare a target PDF against a reference pool.
//!
//! ```bash
//! # Compare one target against a pool of references
//! pdfcompare compare --target paper.pdf corpus/*.pdf
//!
//! # Rewrite-tolerant comparison with a JSON report
//! pdfcompare compare --target paper.pdf corpus/*.pdf --fuzzy --json report.json
//!
//! # Warm the document cache and show pool statistics
//! pdfcompare index corpus/*.pdf
//!
//! # Look inside a cache entry
//! pdfcompare inspect ~/.pdfcompare/index_cache/<key>.dat
//! ```
//!
//! Real PDF extraction needs the `pdf` feature (a system pdfium library);
//! without it the compare and index commands explain how to get one.

use std::path::PathBuf;
use std::process::ExitCode;
#[cfg(feature = "pdf")]
use std::sync::atomic::AtomicBool;

use clap::Parser;
#[cfg(feature = "pdf")]
use indicatif::{ProgressBar, ProgressStyle};

#[cfg(feature = "pdf")]
use pdfcompare::{Phase, Progress};
use pdfcompare::{cache, CompareParams, MatchMode};

mod cli;
use cli::{Cli, Commands};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Compare {
            target,
            refs,
            seed_size,
            merge_gap,
            fuzzy,
            no_smith_waterman,
            lookahead,
            cache_dir,
            no_cache,
            json,
        } => {
            let params = CompareParams {
                seed_size,
                merge_gap,
                mode: if fuzzy { MatchMode::Fuzzy } else { MatchMode::Exact },
                smith_waterman: !no_smith_waterman,
                context_lookahead: lookahead,
            };
            run_compare(&target, &refs, &params, resolve_cache(cache_dir, no_cache), json)
        }
        Commands::Index {
            refs,
            seed_size,
            cache_dir,
            no_cache,
        } => run_index(&refs, seed_size, resolve_cache(cache_dir, no_cache)),
        Commands::Inspect { file } => run_inspect(&file),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn resolve_cache(cache_dir: Option<PathBuf>, no_cache: bool) -> Option<PathBuf> {
    if no_cache {
        None
    } else {
        cache_dir.or_else(cache::CacheStore::default_dir)
    }
}

/// One bar for the whole run; each phase retargets it.
#[cfg(feature = "pdf")]
fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .expect("static template"),
    );
    bar
}

#[cfg(feature = "pdf")]
fn run_compare(
    target: &std::path::Path,
    refs: &[PathBuf],
    params: &CompareParams,
    cache_dir: Option<PathBuf>,
    json: Option<PathBuf>,
) -> Result<(), String> {
    use pdfcompare::{PdfiumExtractor, Pipeline};

    let pipeline = Pipeline::new(PdfiumExtractor, cache_dir);
    let cancel = AtomicBool::new(false);
    let bar = progress_bar();
    let report = |p: Progress| {
        bar.set_length(p.total.max(1));
        bar.set_position(p.current);
        bar.set_message(format!("{}: {}", p.phase.as_str(), p.message));
        if p.phase == Phase::Done {
            bar.finish_and_clear();
        }
    };

    let pool = pipeline
        .build_index(refs, params.seed_size, &report, &cancel)
        .map_err(|e| e.to_string())?;
    let result = pipeline
        .compare(target, &pool, params, &report, &cancel)
        .map_err(|e| e.to_string())?;

    for skipped in &result.skipped {
        eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
    }

    println!(
        "target: {} ({} indexable words)",
        target.display(),
        result.target_word_count
    );
    for (doc_id, score) in &result.per_ref_score {
        println!(
            "  {:5.1}%  {}  {}",
            score * 100.0,
            result.ref_colors[*doc_id as usize],
            result.ref_names[*doc_id as usize]
        );
    }

    if result.matches.is_empty() {
        println!("no overlapping passages found");
    } else {
        println!("{} overlapping passages:", result.matches.len());
        for m in &result.matches {
            println!(
                "  {}  target {:>5}..{:<5}  ref {:>5}..{:<5}  confidence {:.2}  score {}",
                result.ref_names[m.ref_doc as usize],
                m.t_start,
                m.t_end,
                m.r_start,
                m.r_end,
                m.confidence,
                m.score
            );
        }
    }

    if let Some(path) = json {
        let file = std::fs::File::create(&path)
            .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
        serde_json::to_writer_pretty(file, &result)
            .map_err(|e| format!("cannot serialise result: {e}"))?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

#[cfg(feature = "pdf")]
fn run_index(refs: &[PathBuf], seed_size: usize, cache_dir: Option<PathBuf>) -> Result<(), String> {
    use pdfcompare::{PdfiumExtractor, Pipeline};

    let pipeline = Pipeline::new(PdfiumExtractor, cache_dir);
    let cancel = AtomicBool::new(false);
    let bar = progress_bar();
    let report = |p: Progress| {
        bar.set_length(p.total.max(1));
        bar.set_position(p.current);
        bar.set_message(p.message.clone());
    };

    let pool = pipeline
        .build_index(refs, seed_size, &report, &cancel)
        .map_err(|e| e.to_string())?;
    bar.finish_and_clear();

    for skipped in &pool.skipped {
        eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    println!(
        "indexed {} references ({} skipped)",
        pool.docs.len(),
        pool.skipped.len()
    );
    println!(
        "  {} postings over {} distinct {}-grams, ~{} KiB resident",
        pool.index.posting_count(),
        pool.index.term_count(),
        pool.index.seed_size(),
        pool.index.approx_memory() / 1024
    );
    for doc in &pool.docs {
        println!(
            "  {:>8} words  {:>4} pages  {}",
            doc.token_count(),
            doc.pages.len(),
            doc.name
        );
    }
    Ok(())
}

#[cfg(not(feature = "pdf"))]
fn run_compare(
    _target: &std::path::Path,
    _refs: &[PathBuf],
    _params: &CompareParams,
    _cache_dir: Option<PathBuf>,
    _json: Option<PathBuf>,
) -> Result<(), String> {
    Err(no_pdf_backend())
}

#[cfg(not(feature = "pdf"))]
fn run_index(
    _refs: &[PathBuf],
    _seed_size: usize,
    _cache_dir: Option<PathBuf>,
) -> Result<(), String> {
    Err(no_pdf_backend())
}

#[cfg(not(feature = "pdf"))]
fn no_pdf_backend() -> String {
    "this build has no PDF backend; rebuild with `cargo build --features pdf` \
     and install a pdfium library"
        .to_string()
}

fn run_inspect(file: &std::path::Path) -> Result<(), String> {
    let summary = cache::read_summary(file)
        .map_err(|e| format!("{}: {e}", file.display()))?;
    println!("{}", file.display());
    println!("  document  {}", summary.name);
    println!("  version   {}", summary.version);
    println!("  pages     {}", summary.pages);
    println!("  words     {} ({} indexable)", summary.words, summary.tokens);
    println!("  size      {} bytes (checksum ok)", summary.bytes);
    Ok(())
}
