//! Pipeline-level behaviour: degraded documents, boundary inputs,
//! cancellation, parameter validation, and progress reporting.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

use pdfcompare::{
    CompareParams, Error, Phase, Pipeline, Progress, RawDocument,
};

use crate::common::{layout, layout_owned, vocab, StubExtractor, StubFailure};

fn quiet(_: Progress) {}

fn single_ref_pipeline(
    target: RawDocument,
    reference: RawDocument,
) -> (Pipeline<StubExtractor>, Vec<PathBuf>) {
    let stub = StubExtractor::new()
        .with_doc("target.pdf", target)
        .with_doc("ref0.pdf", reference);
    (Pipeline::new(stub, None), vec![PathBuf::from("ref0.pdf")])
}

#[test]
fn unreadable_reference_is_skipped_not_fatal() {
    let words = vocab("base", 30);
    let stub = StubExtractor::new()
        .with_doc("target.pdf", layout_owned(&words))
        .with_doc("good.pdf", layout_owned(&words))
        .with_failure("broken.pdf", StubFailure::Unreadable)
        .with_failure("locked.pdf", StubFailure::Encrypted);
    let pipeline = Pipeline::new(stub, None);
    let cancel = AtomicBool::new(false);

    let pool = pipeline
        .build_index(
            &[
                PathBuf::from("good.pdf"),
                PathBuf::from("broken.pdf"),
                PathBuf::from("locked.pdf"),
            ],
            5,
            &quiet,
            &cancel,
        )
        .expect("pool survives bad documents");

    assert_eq!(pool.docs.len(), 1);
    assert_eq!(pool.skipped.len(), 2);
    assert!(pool.skipped.iter().any(|s| s.reason.contains("encrypted")));

    let result = pipeline
        .compare(
            &PathBuf::from("target.pdf"),
            &pool,
            &CompareParams::default(),
            &quiet,
            &cancel,
        )
        .expect("comparison runs");
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.skipped.len(), 2);
}

#[test]
fn all_references_failing_is_an_empty_pool() {
    let stub = StubExtractor::new().with_failure("broken.pdf", StubFailure::Unreadable);
    let pipeline = Pipeline::new(stub, None);
    let cancel = AtomicBool::new(false);
    let outcome = pipeline.build_index(&[PathBuf::from("broken.pdf")], 5, &quiet, &cancel);
    assert!(matches!(outcome, Err(Error::EmptyPool)));
}

#[test]
fn no_references_is_an_empty_pool() {
    let pipeline = Pipeline::new(StubExtractor::new(), None);
    let cancel = AtomicBool::new(false);
    assert!(matches!(
        pipeline.build_index(&[], 5, &quiet, &cancel),
        Err(Error::EmptyPool)
    ));
}

#[test]
fn unreadable_target_is_no_target() {
    let (pipeline, refs) = {
        let stub = StubExtractor::new()
            .with_doc("ref0.pdf", layout_owned(&vocab("base", 30)))
            .with_failure("target.pdf", StubFailure::Unreadable);
        (Pipeline::new(stub, None), vec![PathBuf::from("ref0.pdf")])
    };
    let cancel = AtomicBool::new(false);
    let pool = pipeline.build_index(&refs, 5, &quiet, &cancel).unwrap();
    let outcome = pipeline.compare(
        &PathBuf::from("target.pdf"),
        &pool,
        &CompareParams::default(),
        &quiet,
        &cancel,
    );
    assert!(matches!(outcome, Err(Error::NoTarget(_))));
}

#[test]
fn empty_target_yields_no_matches() {
    let (pipeline, refs) = single_ref_pipeline(layout(&[]), layout_owned(&vocab("base", 30)));
    let cancel = AtomicBool::new(false);
    let pool = pipeline.build_index(&refs, 5, &quiet, &cancel).unwrap();
    let result = pipeline
        .compare(
            &PathBuf::from("target.pdf"),
            &pool,
            &CompareParams::default(),
            &quiet,
            &cancel,
        )
        .unwrap();
    assert!(result.matches.is_empty());
    assert_eq!(result.target_word_count, 0);
    assert_eq!(result.per_ref_score[&0], 0.0);
}

#[test]
fn reference_shorter_than_seed_contributes_nothing() {
    let (pipeline, refs) = single_ref_pipeline(
        layout_owned(&vocab("base", 30)),
        layout(&["lonely", "pair", "here"]),
    );
    let cancel = AtomicBool::new(false);
    let pool = pipeline.build_index(&refs, 5, &quiet, &cancel).unwrap();
    assert_eq!(pool.index.posting_count(), 0);
    let result = pipeline
        .compare(
            &PathBuf::from("target.pdf"),
            &pool,
            &CompareParams::default(),
            &quiet,
            &cancel,
        )
        .unwrap();
    assert!(result.matches.is_empty());
}

#[test]
fn invalid_seed_size_is_rejected_before_work() {
    let pipeline = Pipeline::new(StubExtractor::new(), None);
    let cancel = AtomicBool::new(false);
    assert!(matches!(
        pipeline.build_index(&[PathBuf::from("ref0.pdf")], 1, &quiet, &cancel),
        Err(Error::InvalidParam(_))
    ));
}

#[test]
fn mismatched_seed_size_is_rejected() {
    let (pipeline, refs) = single_ref_pipeline(
        layout_owned(&vocab("base", 30)),
        layout_owned(&vocab("base", 30)),
    );
    let cancel = AtomicBool::new(false);
    let pool = pipeline.build_index(&refs, 5, &quiet, &cancel).unwrap();
    let params = CompareParams {
        seed_size: 4,
        ..CompareParams::default()
    };
    let outcome = pipeline.compare(&PathBuf::from("target.pdf"), &pool, &params, &quiet, &cancel);
    assert!(matches!(outcome, Err(Error::InvalidParam(_))));
}

#[test]
fn pre_set_cancel_flag_cancels_the_build() {
    let stub = StubExtractor::new().with_doc("ref0.pdf", layout_owned(&vocab("base", 30)));
    let pipeline = Pipeline::new(stub, None);
    let cancel = AtomicBool::new(true);
    let outcome = pipeline.build_index(&[PathBuf::from("ref0.pdf")], 5, &quiet, &cancel);
    assert!(matches!(outcome, Err(Error::Cancelled)));
}

#[test]
fn pre_set_cancel_flag_cancels_the_compare() {
    let (pipeline, refs) = single_ref_pipeline(
        layout_owned(&vocab("base", 30)),
        layout_owned(&vocab("base", 30)),
    );
    let not_yet = AtomicBool::new(false);
    let pool = pipeline.build_index(&refs, 5, &quiet, &not_yet).unwrap();
    let cancel = AtomicBool::new(true);
    let outcome = pipeline.compare(
        &PathBuf::from("target.pdf"),
        &pool,
        &CompareParams::default(),
        &quiet,
        &cancel,
    );
    assert!(matches!(outcome, Err(Error::Cancelled)));
}

#[test]
fn progress_reports_every_phase_in_order() {
    let (pipeline, refs) = single_ref_pipeline(
        layout_owned(&vocab("base", 30)),
        layout_owned(&vocab("base", 30)),
    );
    let cancel = AtomicBool::new(false);
    let events: Mutex<Vec<Progress>> = Mutex::new(Vec::new());
    let record = |p: Progress| events.lock().unwrap().push(p);

    let pool = pipeline.build_index(&refs, 5, &record, &cancel).unwrap();
    pipeline
        .compare(
            &PathBuf::from("target.pdf"),
            &pool,
            &CompareParams::default(),
            &record,
            &cancel,
        )
        .unwrap();

    let events = events.into_inner().unwrap();
    let phases: Vec<Phase> = events.iter().map(|e| e.phase).collect();
    assert!(phases.contains(&Phase::Index));
    assert!(phases.contains(&Phase::Compare));
    assert!(phases.contains(&Phase::Align));
    assert_eq!(*phases.last().unwrap(), Phase::Done);
    // Phases arrive in pipeline order.
    let first_align = phases.iter().position(|p| *p == Phase::Align).unwrap();
    let last_index = phases.iter().rposition(|p| *p == Phase::Index).unwrap();
    assert!(last_index < first_align);
    for event in &events {
        assert!(event.current <= event.total.max(1));
    }
}

#[test]
fn similarity_scores_stay_within_bounds() {
    let shared = vocab("boiler", 20);
    let target_words = crate::common::concat(&[&vocab("tpad", 10), &shared, &vocab("ttail", 10)]);
    let (pipeline, refs) = single_ref_pipeline(
        layout_owned(&target_words),
        layout_owned(&shared),
    );
    let cancel = AtomicBool::new(false);
    let pool = pipeline.build_index(&refs, 5, &quiet, &cancel).unwrap();
    let result = pipeline
        .compare(
            &PathBuf::from("target.pdf"),
            &pool,
            &CompareParams::default(),
            &quiet,
            &cancel,
        )
        .unwrap();
    for score in result.per_ref_score.values() {
        assert!((0.0..=1.0).contains(score));
    }
    assert_eq!(result.per_ref_score[&0], 0.5);
}
