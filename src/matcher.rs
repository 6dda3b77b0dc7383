//! Identity decisions between name records.
//!
//! Three rungs, tried in order: exact normalized-key equality, key-part
//! (surname + given name) overlap, and fuzzy similarity. Only the first two
//! establish identity; a similarity hit is a candidate misspelling and is
//! surfaced for review, never merged.

use std::collections::BTreeSet;

use crate::model::{MatchResult, NormalizedKey};
use crate::normalize::{normalize, split_party};

/// Default similarity band floor for candidate misspellings.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Key identifying parts of a name: for each party token of the normalized
/// name, its final word (surname) plus, when the token has two or more
/// words, its first word (given name).
pub fn key_parts(name: &str) -> BTreeSet<String> {
    let normalized = normalize(name);
    let mut parts = BTreeSet::new();
    for token in split_party(normalized.as_str()) {
        let words: Vec<&str> = token.split_whitespace().collect();
        if let Some(last) = words.last() {
            parts.insert((*last).to_string());
            if words.len() > 1 {
                parts.insert(words[0].to_string());
            }
        }
    }
    parts
}

/// Decide whether two name strings denote the same entity.
pub fn match_names(a: &str, b: &str, similarity_threshold: f64) -> MatchResult {
    let key_a = normalize(a);
    let key_b = normalize(b);

    if !key_a.is_empty() && key_a == key_b {
        return MatchResult::Equal;
    }

    let parts_a = key_parts(a);
    let parts_b = key_parts(b);
    if !parts_a.is_empty() && !parts_b.is_empty() {
        let overlap = parts_a.intersection(&parts_b).count();
        if overlap >= 2 {
            return MatchResult::TokenOverlap(overlap);
        }
        // Single-surname-only entries on both sides
        if parts_a.len() == 1 && parts_b.len() == 1 && overlap == 1 {
            return MatchResult::TokenOverlap(1);
        }
    }

    if !key_a.is_empty() && !key_b.is_empty() {
        let ratio = similarity(&key_a, &key_b);
        if ratio >= similarity_threshold && ratio < 1.0 {
            return MatchResult::Similar(ratio);
        }
    }

    MatchResult::NoMatch
}

/// Normalized edit-distance ratio between two keys, in [0, 1].
pub fn similarity(a: &NormalizedKey, b: &NormalizedKey) -> f64 {
    strsim::normalized_levenshtein(a.as_str(), b.as_str())
}
