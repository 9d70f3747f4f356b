//! Alignment properties: score bounds, span sanity, determinism, and a
//! differential oracle for the bounded edit distance.

use pdfcompare::{smith_waterman_span, within_edit_distance};
use proptest::prelude::*;

fn token_vec(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::vec(0u32..6, 1..max_len)
}

proptest! {
    /// The alignment score never exceeds a full match over the shorter side.
    #[test]
    fn score_is_bounded(t in token_vec(24), r in token_vec(24)) {
        if let Some(span) = smith_waterman_span(&t, &r).unwrap() {
            let bound = 2 * t.len().min(r.len()) as i32;
            prop_assert!(span.score > 0);
            prop_assert!(span.score <= bound, "score {} over bound {}", span.score, bound);
        }
    }

    /// Returned spans stay inside their slices and are properly ordered.
    #[test]
    fn spans_are_well_formed(t in token_vec(24), r in token_vec(24)) {
        if let Some(span) = smith_waterman_span(&t, &r).unwrap() {
            prop_assert!(span.t_start <= span.t_end);
            prop_assert!(span.t_end < t.len());
            prop_assert!(span.r_start <= span.r_end);
            prop_assert!(span.r_end < r.len());
        }
    }

    /// Alignment is a pure function of its inputs.
    #[test]
    fn alignment_is_deterministic(t in token_vec(24), r in token_vec(24)) {
        let first = smith_waterman_span(&t, &r).unwrap();
        let second = smith_waterman_span(&t, &r).unwrap();
        prop_assert_eq!(first, second);
    }

    /// A sequence aligned against itself matches end to end.
    #[test]
    fn self_alignment_is_total(t in token_vec(24)) {
        let span = smith_waterman_span(&t, &t).unwrap().expect("non-empty input aligns");
        prop_assert_eq!(span.score, 2 * t.len() as i32);
        prop_assert_eq!((span.t_start, span.t_end), (0, t.len() - 1));
        prop_assert_eq!((span.r_start, span.r_end), (0, t.len() - 1));
    }

    /// The bounded check agrees with a naive full edit-distance oracle.
    #[test]
    fn levenshtein_matches_oracle(
        a in "[a-c]{0,8}",
        b in "[a-c]{0,8}",
        max in 0usize..4,
    ) {
        prop_assert_eq!(within_edit_distance(&a, &b, max), naive_levenshtein(&a, &b) <= max);
    }
}

/// Textbook full-matrix edit distance, as the oracle.
fn naive_levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        dp[0][j] = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[a.len()][b.len()]
}
