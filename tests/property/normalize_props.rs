//! Normalisation properties: idempotence and filter behaviour.

use pdfcompare::{is_stop_word, normalize_token};
use proptest::prelude::*;

proptest! {
    /// Normalising twice is the same as normalising once.
    #[test]
    fn normalisation_is_idempotent(raw in "\\PC{0,24}") {
        let once = normalize_token(&raw);
        prop_assert_eq!(normalize_token(&once), once.clone());
    }

    /// Normalised tokens never carry leading or trailing punctuation.
    #[test]
    fn edges_are_alphanumeric(raw in "\\PC{1,24}") {
        let token = normalize_token(&raw);
        if let Some(first) = token.chars().next() {
            prop_assert!(first.is_alphanumeric());
        }
        if let Some(last) = token.chars().last() {
            prop_assert!(last.is_alphanumeric());
        }
    }

    /// Normalisation never produces uppercase output.
    #[test]
    fn output_is_lowercase(raw in "\\PC{0,24}") {
        let token = normalize_token(&raw);
        prop_assert_eq!(token.to_lowercase(), token.clone());
    }
}

#[test]
fn stop_word_membership_spot_checks() {
    for word in ["the", "and", "of", "whether"] {
        assert!(is_stop_word(word), "{word} should be filtered");
    }
    for word in ["detection", "pipeline", "quartz"] {
        assert!(!is_stop_word(word), "{word} should survive");
    }
}
