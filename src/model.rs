use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::error::ReconError;
use crate::normalize::normalize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single row from a source collection, as loaded. Empty strings mean the
/// column was absent or blank in the source.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub collection: String,
    pub display_name: String,
    pub notes: String,
    pub headcount_field: String,
    /// Original row position, for stable output.
    pub seq: usize,
}

/// Pre-loaded records grouped by collection name.
pub struct ReconInput {
    pub collections: HashMap<String, Vec<RawRecord>>,
}

// ---------------------------------------------------------------------------
// Keys + derived views
// ---------------------------------------------------------------------------

/// Canonical lowercase, whitespace-collapsed, title/suffix-stripped form of
/// a name, used as the identity comparison key. Not unique across records:
/// several rows normalizing to the same key is how duplicates are found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub(crate) fn new(key: String) -> Self {
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty keys are never a valid identity.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named collection of records with a derived key index. Records whose
/// display name normalizes to the empty key are kept in `records` but never
/// indexed, so they take no part in set arithmetic.
pub struct CollectionView {
    pub name: String,
    pub records: Vec<RawRecord>,
    by_key: BTreeMap<NormalizedKey, Vec<usize>>,
}

impl CollectionView {
    pub fn new(name: &str, records: Vec<RawRecord>) -> Self {
        let mut by_key: BTreeMap<NormalizedKey, Vec<usize>> = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            let key = normalize(&record.display_name);
            if !key.is_empty() {
                by_key.entry(key).or_default().push(i);
            }
        }
        Self {
            name: name.to_string(),
            records,
            by_key,
        }
    }

    /// Distinct normalized keys, in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &NormalizedKey> {
        self.by_key.keys()
    }

    /// (key, record indices) pairs, in lexicographic key order.
    pub fn entries(&self) -> impl Iterator<Item = (&NormalizedKey, &[usize])> {
        self.by_key.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn contains_key(&self, key: &NormalizedKey) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn get_key_value(&self, key: &NormalizedKey) -> Option<(&NormalizedKey, &[usize])> {
        self.by_key
            .get_key_value(key)
            .map(|(k, v)| (k, v.as_slice()))
    }

    /// Records sharing the given normalized key, in original order.
    pub fn records_for(&self, key: &NormalizedKey) -> Vec<&RawRecord> {
        self.by_key
            .get(key)
            .map(|idxs| idxs.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// Display names of all records sharing the given key.
    pub fn display_names_for(&self, key: &NormalizedKey) -> Vec<String> {
        self.records_for(key)
            .iter()
            .map(|r| r.display_name.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Headcounts
// ---------------------------------------------------------------------------

/// `(base, plus_ones, total)` with `base + plus_ones == total` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeadcountTriple {
    pub base: u32,
    pub plus_ones: u32,
    pub total: u32,
}

impl HeadcountTriple {
    pub fn new(base: u32, plus_ones: u32) -> Self {
        Self {
            base,
            plus_ones,
            total: base + plus_ones,
        }
    }

    /// Build from a known total and a plus-one count. A plus-one count
    /// exceeding the total (malformed input) clamps base to zero and folds
    /// the remainder into plus_ones so the invariant holds.
    pub fn from_total(total: u32, plus_ones: u32) -> Self {
        let base = total.saturating_sub(plus_ones);
        Self {
            base,
            plus_ones: total - base,
            total,
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Relation between two name records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchResult {
    /// Normalized keys are equal (and nonempty).
    Equal,
    /// At least this many surname/given-name key parts are shared.
    TokenOverlap(usize),
    /// Similarity ratio in the candidate-misspelling band. Never treated as
    /// an identity; surfaced for review instead.
    Similar(f64),
    NoMatch,
}

impl MatchResult {
    /// Only exact and token-overlap outcomes establish identity for set
    /// arithmetic.
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Equal | Self::TokenOverlap(_))
    }
}

// ---------------------------------------------------------------------------
// Discrepancies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    DuplicateWithinCollection,
    MissingFromReference,
    ExtraBeyondReference,
    MissingLastName,
    MissingTitle,
    PossibleMisspelling,
    HeadcountMismatch,
}

impl fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateWithinCollection => write!(f, "duplicate_within_collection"),
            Self::MissingFromReference => write!(f, "missing_from_reference"),
            Self::ExtraBeyondReference => write!(f, "extra_beyond_reference"),
            Self::MissingLastName => write!(f, "missing_last_name"),
            Self::MissingTitle => write!(f, "missing_title"),
            Self::PossibleMisspelling => write!(f, "possible_misspelling"),
            Self::HeadcountMismatch => write!(f, "headcount_mismatch"),
        }
    }
}

/// A `Similar`-band candidate attached to a missing-identity discrepancy.
/// A suggestion is advisory: the engine never merges on it.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub display_name: String,
    pub collection: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeadcountDelta {
    pub left_total: u32,
    pub right_total: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    /// Label of the rule that produced this discrepancy.
    pub rule: String,
    /// Implicated collection names, subject first.
    pub collections: Vec<String>,
    pub key: NormalizedKey,
    /// Display names of the implicated record(s).
    pub display_names: Vec<String>,
    /// Offending party token, for name-format discrepancies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<HeadcountDelta>,
}

/// A name that matched more than one candidate equally well. The first
/// candidate in collection order was used; the engine never decides
/// silently, so the full candidate list is surfaced.
#[derive(Debug, Clone, Serialize)]
pub struct Ambiguity {
    pub rule: String,
    pub collection: String,
    pub display_name: String,
    pub candidates: Vec<String>,
    pub chosen: String,
}

/// A rule that could not run because input collections were absent.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRule {
    pub rule: String,
    pub missing_collections: Vec<String>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub total_discrepancies: usize,
    pub duplicates: usize,
    pub missing: usize,
    pub extras: usize,
    pub name_format_issues: usize,
    pub possible_misspellings: usize,
    pub headcount_mismatches: usize,
    pub skipped_rules: usize,
    pub kind_counts: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub discrepancies: Vec<Discrepancy>,
    pub ambiguities: Vec<Ambiguity>,
    pub skipped: Vec<SkippedRule>,
}

impl ReconReport {
    /// Serialize for an external report sink. The engine itself never
    /// renders human-readable text.
    pub fn to_json(&self) -> Result<String, ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| ReconError::Io(e.to_string()))
    }
}
