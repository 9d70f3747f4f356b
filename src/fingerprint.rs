// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Process-stable n-gram fingerprints.
//!
//! A fingerprint is the 64-bit XxHash of the window's tokens joined by a
//! separator byte, hashed with a fixed compile-time seed. Two properties
//! matter and both are load-bearing:
//!
//! 1. **Stability.** The same tokens produce the same fingerprint in every
//!    process, so fingerprints can be recomputed over cached documents
//!    without re-reading the PDFs. A randomly seeded hasher (std's default
//!    `HashMap` hasher, for instance) would silently break this.
//! 2. **Boundary safety.** The `0x1F` separator keeps `["ab", "c"]` and
//!    `["a", "bc"]` from colliding. Tokens never contain control bytes, so
//!    the separator cannot be forged from token content.

use std::hash::Hasher;

use twox_hash::XxHash64;

/// Fixed seed. Changing it invalidates nothing on disk (fingerprints are
/// never persisted) but breaks cross-version determinism tests, so don't.
const SEED: u64 = 0x7064_6663_6d70_7231;

/// Separator written between tokens; an ASCII unit separator, which the
/// normaliser can never emit inside a token.
const SEP: u8 = 0x1F;

/// Fingerprint a window of normalised tokens.
pub fn fingerprint<S: AsRef<str>>(tokens: &[S]) -> u64 {
    let mut hasher = XxHash64::with_seed(SEED);
    for token in tokens {
        hasher.write(token.as_ref().as_bytes());
        hasher.write(&[SEP]);
    }
    hasher.finish()
}

/// Stable 64-bit hash of arbitrary bytes with the same fixed seed. Used for
/// match identifiers and per-reference colours, not for index keys.
pub fn stable_hash(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(SEED);
    hasher.write(bytes);
    hasher.finish()
}
