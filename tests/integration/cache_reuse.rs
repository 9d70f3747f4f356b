//! The document cache across pipeline instances: hits skip extraction,
//! content changes invalidate, corruption falls back to a re-parse.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use pdfcompare::{Pipeline, Progress};

use crate::common::{layout_owned, vocab, StubExtractor};

fn quiet(_: Progress) {}

fn cache_entries(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "dat"))
                .collect()
        })
        .unwrap_or_default();
    entries.sort();
    entries
}

#[test]
fn cache_hit_skips_extraction_across_instances() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let cache_dir = workspace.path().join("cache");
    let pdf_path = workspace.path().join("doc.pdf");
    fs::write(&pdf_path, b"stand-in bytes").unwrap();

    let words = vocab("cached", 30);
    let cancel = AtomicBool::new(false);

    let first_stub = StubExtractor::new().with_doc(&pdf_path, layout_owned(&words));
    let first = Pipeline::new(&first_stub, Some(cache_dir.clone()));
    let pool = first
        .build_index(&[pdf_path.clone()], 5, &quiet, &cancel)
        .expect("first build parses");
    assert_eq!(first_stub.extraction_count(), 1);
    assert_eq!(cache_entries(&cache_dir).len(), 1);

    // A second instance with the same cache never calls its extractor.
    let second_stub = StubExtractor::new().with_doc(&pdf_path, layout_owned(&words));
    let second = Pipeline::new(&second_stub, Some(cache_dir.clone()));
    let warm_pool = second
        .build_index(&[pdf_path.clone()], 5, &quiet, &cancel)
        .expect("second build loads the cache");
    assert_eq!(second_stub.extraction_count(), 0);
    assert_eq!(warm_pool.docs[0], pool.docs[0]);
}

#[test]
fn changed_file_misses_the_cache() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let cache_dir = workspace.path().join("cache");
    let pdf_path = workspace.path().join("doc.pdf");
    fs::write(&pdf_path, b"original").unwrap();

    let words = vocab("cached", 30);
    let cancel = AtomicBool::new(false);

    let stub = StubExtractor::new().with_doc(&pdf_path, layout_owned(&words));
    let pipeline = Pipeline::new(&stub, Some(cache_dir.clone()));
    pipeline
        .build_index(&[pdf_path.clone()], 5, &quiet, &cancel)
        .unwrap();
    assert_eq!(stub.extraction_count(), 1);

    // Same path, different size: a different document version.
    fs::write(&pdf_path, b"grown by a rewrite, no longer the same file").unwrap();
    pipeline
        .build_index(&[pdf_path.clone()], 5, &quiet, &cancel)
        .unwrap();
    assert_eq!(stub.extraction_count(), 2);
}

#[test]
fn corrupt_cache_entry_forces_a_reparse() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let cache_dir = workspace.path().join("cache");
    let pdf_path = workspace.path().join("doc.pdf");
    fs::write(&pdf_path, b"stand-in bytes").unwrap();

    let words = vocab("cached", 30);
    let cancel = AtomicBool::new(false);

    let stub = StubExtractor::new().with_doc(&pdf_path, layout_owned(&words));
    let pipeline = Pipeline::new(&stub, Some(cache_dir.clone()));
    pipeline
        .build_index(&[pdf_path.clone()], 5, &quiet, &cancel)
        .unwrap();
    assert_eq!(stub.extraction_count(), 1);

    let entry = cache_entries(&cache_dir).pop().expect("one entry");
    fs::write(&entry, b"scribbled over").unwrap();

    let pool = pipeline
        .build_index(&[pdf_path.clone()], 5, &quiet, &cancel)
        .expect("corruption degrades to a re-parse");
    assert_eq!(stub.extraction_count(), 2);
    assert_eq!(pool.docs[0].token_count(), 30);

    // The re-parse rewrote a valid entry.
    let entry = cache_entries(&cache_dir).pop().expect("entry restored");
    assert!(pdfcompare::cache::read_summary(&entry).is_ok());
}
