use std::collections::{BTreeMap, BTreeSet};

use crate::config::{CollectionConfig, ReconConfig, RuleConfig};
use crate::error::ReconError;
use crate::headcount;
use crate::matcher::{match_names, similarity};
use crate::model::{
    Ambiguity, CollectionView, Discrepancy, DiscrepancyKind, HeadcountDelta, MatchResult,
    NormalizedKey, RawRecord, ReconInput, ReconMeta, ReconReport, SkippedRule, Suggestion,
};
use crate::normalize::{has_last_name, has_title, is_placeholder_token, normalize, split_party};
use crate::summary::compute_summary;

/// Run reconciliation per config. Rules referencing collections absent from
/// the input are skipped and reported, never fatal.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconReport, ReconError> {
    let mut views: BTreeMap<String, CollectionView> = BTreeMap::new();
    for (name, records) in &input.collections {
        views.insert(name.clone(), CollectionView::new(name, records.clone()));
    }

    let threshold = config.matching.similarity_threshold;
    let mut discrepancies = Vec::new();
    let mut ambiguities = Vec::new();
    let mut skipped = Vec::new();

    for rule in &config.rules {
        let missing: Vec<String> = rule
            .collection_refs()
            .iter()
            .filter(|name| !views.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            skipped.push(SkippedRule {
                rule: rule.label(),
                missing_collections: missing,
            });
            continue;
        }

        let label = rule.label();
        let mut found = match rule {
            RuleConfig::SubsetOf { subject, reference } => eval_subset_of(
                &views[subject],
                &views[reference],
                threshold,
                &label,
                &mut ambiguities,
            ),
            RuleConfig::PartitionEquals {
                left,
                right,
                whole,
                exclusion,
            } => eval_partition_equals(
                &views[left],
                &views[right],
                &views[whole],
                exclusion.as_ref().map(|name| &views[name]),
                threshold,
                &label,
                &mut ambiguities,
            ),
            RuleConfig::Disjoint { left, right } => eval_disjoint(
                &views[left],
                &views[right],
                threshold,
                &label,
                &mut ambiguities,
            ),
            RuleConfig::NoInternalDuplicates { collection } => {
                eval_no_internal_duplicates(&views[collection], &label)
            }
            RuleConfig::CompleteNames { collection } => {
                eval_complete_names(&views[collection], &label)
            }
            RuleConfig::TitlesMatch { subject, reference } => {
                eval_titles_match(&views[subject], &views[reference], &label)
            }
            RuleConfig::HeadcountMatches { left, right } => eval_headcount_matches(
                &views[left],
                &views[right],
                threshold,
                &label,
                &mut ambiguities,
            ),
        };

        // Deterministic output: by collection set, then by key
        found.sort_by(|a, b| (&a.collections, &a.key).cmp(&(&b.collections, &b.key)));
        discrepancies.extend(found);
    }

    discrepancies.extend(misspelling_scan(&views, threshold));

    let summary = compute_summary(&discrepancies, &skipped);

    Ok(ReconReport {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        discrepancies,
        ambiguities,
        skipped,
    })
}

// ---------------------------------------------------------------------------
// Identity lookup
// ---------------------------------------------------------------------------

/// A resolved identity in a target collection.
struct IdentityHit<'v> {
    key: &'v NormalizedKey,
    /// Display names of all equally-good candidates. More than one means the
    /// match was ambiguous and the first in collection order was chosen.
    candidates: Vec<String>,
}

/// Find the identity of `(display_name, key)` in `target`: exact key first,
/// then the best token-overlap candidate in collection order.
fn find_identity<'v>(
    display_name: &str,
    key: &NormalizedKey,
    target: &'v CollectionView,
    threshold: f64,
) -> Option<IdentityHit<'v>> {
    if let Some((found, _)) = target.get_key_value(key) {
        return Some(IdentityHit {
            key: found,
            candidates: Vec::new(),
        });
    }

    let mut best_overlap = 0usize;
    let mut best: Vec<usize> = Vec::new();
    for (i, record) in target.records.iter().enumerate() {
        if let MatchResult::TokenOverlap(overlap) =
            match_names(display_name, &record.display_name, threshold)
        {
            if overlap > best_overlap {
                best_overlap = overlap;
                best = vec![i];
            } else if overlap == best_overlap {
                best.push(i);
            }
        }
    }

    let &chosen = best.first()?;
    let chosen_key = normalize(&target.records[chosen].display_name);
    let (found, _) = target.get_key_value(&chosen_key)?;
    Some(IdentityHit {
        key: found,
        candidates: best
            .iter()
            .map(|&i| target.records[i].display_name.clone())
            .collect(),
    })
}

/// Record an ambiguity when a hit had more than one equally-good candidate.
fn note_ambiguity(
    ambiguities: &mut Vec<Ambiguity>,
    hit: &IdentityHit<'_>,
    rule: &str,
    collection: &str,
    display_name: &str,
) {
    if hit.candidates.len() > 1 {
        ambiguities.push(Ambiguity {
            rule: rule.to_string(),
            collection: collection.to_string(),
            display_name: display_name.to_string(),
            candidates: hit.candidates.clone(),
            chosen: hit.candidates[0].clone(),
        });
    }
}

/// Best `Similar`-band candidate in `target`, as a suggested correction.
fn find_suggestion(
    key: &NormalizedKey,
    target: &CollectionView,
    threshold: f64,
) -> Option<Suggestion> {
    let mut best: Option<(f64, &NormalizedKey)> = None;
    for other in target.keys() {
        let score = similarity(key, other);
        if score >= threshold && score < 1.0 && best.map_or(true, |(b, _)| score > b) {
            best = Some((score, other));
        }
    }
    best.map(|(score, other)| Suggestion {
        display_name: target.display_names_for(other).swap_remove(0),
        collection: target.name.clone(),
        score,
    })
}

// ---------------------------------------------------------------------------
// Rule evaluation
// ---------------------------------------------------------------------------

fn eval_subset_of(
    subject: &CollectionView,
    reference: &CollectionView,
    threshold: f64,
    rule: &str,
    ambiguities: &mut Vec<Ambiguity>,
) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    for (key, _) in subject.entries() {
        let display_names = subject.display_names_for(key);
        match find_identity(&display_names[0], key, reference, threshold) {
            Some(hit) => {
                note_ambiguity(ambiguities, &hit, rule, reference.name.as_str(), &display_names[0])
            }
            None => out.push(Discrepancy {
                kind: DiscrepancyKind::MissingFromReference,
                rule: rule.to_string(),
                collections: vec![subject.name.clone(), reference.name.clone()],
                key: key.clone(),
                display_names,
                token: None,
                suggestion: find_suggestion(key, reference, threshold),
                totals: None,
            }),
        }
    }
    out
}

fn eval_partition_equals(
    left: &CollectionView,
    right: &CollectionView,
    whole: &CollectionView,
    exclusion: Option<&CollectionView>,
    threshold: f64,
    rule: &str,
    ambiguities: &mut Vec<Ambiguity>,
) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    let excluded: BTreeSet<&NormalizedKey> = exclusion
        .map(|view| view.keys().collect())
        .unwrap_or_default();

    // Expected identities absent from the union
    for (key, _) in whole.entries() {
        if excluded.contains(key) {
            continue;
        }
        let display_names = whole.display_names_for(key);
        let in_left = find_identity(&display_names[0], key, left, threshold);
        let in_right = find_identity(&display_names[0], key, right, threshold);
        if let Some(hit) = &in_left {
            note_ambiguity(ambiguities, hit, rule, left.name.as_str(), &display_names[0]);
        }
        if let Some(hit) = &in_right {
            note_ambiguity(ambiguities, hit, rule, right.name.as_str(), &display_names[0]);
        }
        if in_left.is_none() && in_right.is_none() {
            let suggestion = find_suggestion(key, left, threshold)
                .or_else(|| find_suggestion(key, right, threshold));
            out.push(Discrepancy {
                kind: DiscrepancyKind::MissingFromReference,
                rule: rule.to_string(),
                collections: vec![whole.name.clone(), left.name.clone(), right.name.clone()],
                key: key.clone(),
                display_names,
                token: None,
                suggestion,
                totals: None,
            });
        }
    }

    // Union members that are excluded or unknown to the whole
    for (side_index, side) in [left, right].into_iter().enumerate() {
        for (key, _) in side.entries() {
            // Deduplicate the union: a key in both sides is reported once,
            // from the left side.
            if side_index == 1 && left.contains_key(key) {
                continue;
            }
            let display_names = side.display_names_for(key);
            if excluded.contains(key) {
                let excl_name = exclusion.map(|v| v.name.clone()).unwrap_or_default();
                out.push(Discrepancy {
                    kind: DiscrepancyKind::ExtraBeyondReference,
                    rule: rule.to_string(),
                    collections: vec![side.name.clone(), excl_name],
                    key: key.clone(),
                    display_names,
                    token: None,
                    suggestion: None,
                    totals: None,
                });
            } else if find_identity(&display_names[0], key, whole, threshold).is_none() {
                out.push(Discrepancy {
                    kind: DiscrepancyKind::ExtraBeyondReference,
                    rule: rule.to_string(),
                    collections: vec![side.name.clone(), whole.name.clone()],
                    key: key.clone(),
                    display_names,
                    token: None,
                    suggestion: find_suggestion(key, whole, threshold),
                    totals: None,
                });
            }
        }
    }

    out
}

fn eval_disjoint(
    left: &CollectionView,
    right: &CollectionView,
    threshold: f64,
    rule: &str,
    ambiguities: &mut Vec<Ambiguity>,
) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    for (key, _) in left.entries() {
        let mut display_names = left.display_names_for(key);
        if let Some(hit) = find_identity(&display_names[0], key, right, threshold) {
            note_ambiguity(ambiguities, &hit, rule, right.name.as_str(), &display_names[0]);
            display_names.extend(right.display_names_for(hit.key));
            out.push(Discrepancy {
                kind: DiscrepancyKind::DuplicateWithinCollection,
                rule: rule.to_string(),
                collections: vec![left.name.clone(), right.name.clone()],
                key: key.clone(),
                display_names,
                token: None,
                suggestion: None,
                totals: None,
            });
        }
    }
    out
}

fn eval_no_internal_duplicates(view: &CollectionView, rule: &str) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    for (key, indices) in view.entries() {
        if indices.len() > 1 {
            out.push(Discrepancy {
                kind: DiscrepancyKind::DuplicateWithinCollection,
                rule: rule.to_string(),
                collections: vec![view.name.clone()],
                key: key.clone(),
                display_names: view.display_names_for(key),
                token: None,
                suggestion: None,
                totals: None,
            });
        }
    }
    out
}

fn eval_complete_names(view: &CollectionView, rule: &str) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    for (key, _) in view.entries() {
        for record in view.records_for(key) {
            for token in split_party(&record.display_name) {
                if !is_placeholder_token(&token) && !has_last_name(&token) {
                    out.push(Discrepancy {
                        kind: DiscrepancyKind::MissingLastName,
                        rule: rule.to_string(),
                        collections: vec![view.name.clone()],
                        key: key.clone(),
                        display_names: vec![record.display_name.clone()],
                        token: Some(token),
                        suggestion: None,
                        totals: None,
                    });
                }
            }
        }
    }
    out
}

fn eval_titles_match(
    subject: &CollectionView,
    reference: &CollectionView,
    rule: &str,
) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    for (key, _) in subject.entries() {
        if !reference.contains_key(key) {
            continue;
        }
        let reference_names = reference.display_names_for(key);
        let Some(titled) = reference_names.iter().find(|name| has_title(name)) else {
            continue;
        };
        for record in subject.records_for(key) {
            if !has_title(&record.display_name) {
                out.push(Discrepancy {
                    kind: DiscrepancyKind::MissingTitle,
                    rule: rule.to_string(),
                    collections: vec![subject.name.clone(), reference.name.clone()],
                    key: key.clone(),
                    display_names: vec![record.display_name.clone(), titled.clone()],
                    token: None,
                    suggestion: None,
                    totals: None,
                });
            }
        }
    }
    out
}

fn eval_headcount_matches(
    left: &CollectionView,
    right: &CollectionView,
    threshold: f64,
    rule: &str,
    ambiguities: &mut Vec<Ambiguity>,
) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    for (key, _) in left.entries() {
        let left_names = left.display_names_for(key);
        let Some(hit) = find_identity(&left_names[0], key, right, threshold) else {
            continue;
        };
        note_ambiguity(ambiguities, &hit, rule, right.name.as_str(), &left_names[0]);

        let left_total = resolved_total(&left.records_for(key));
        let right_total = resolved_total(&right.records_for(hit.key));
        if left_total != right_total {
            let mut display_names = left_names;
            display_names.extend(right.display_names_for(hit.key));
            out.push(Discrepancy {
                kind: DiscrepancyKind::HeadcountMismatch,
                rule: rule.to_string(),
                collections: vec![left.name.clone(), right.name.clone()],
                key: key.clone(),
                display_names,
                token: None,
                suggestion: None,
                totals: Some(HeadcountDelta {
                    left_total,
                    right_total,
                }),
            });
        }
    }
    out
}

/// Resolved total over all records sharing a key (duplicate rows sum).
fn resolved_total(records: &[&RawRecord]) -> u32 {
    records
        .iter()
        .map(|r| headcount::resolve(&r.headcount_field, &r.notes, &r.display_name).total)
        .sum()
}

// ---------------------------------------------------------------------------
// Cross-collection misspelling scan
// ---------------------------------------------------------------------------

/// All-pairs similarity scan across collections. Keys scoring inside the
/// similarity band denote a candidate misspelling, reported once per key
/// pair. O(n*m) over distinct keys; fine at guest-list scale.
fn misspelling_scan(
    views: &BTreeMap<String, CollectionView>,
    threshold: f64,
) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    let names: Vec<&String> = views.keys().collect();
    let mut seen: BTreeSet<(NormalizedKey, NormalizedKey)> = BTreeSet::new();

    for (i, left_name) in names.iter().enumerate() {
        for right_name in &names[i + 1..] {
            let left = &views[*left_name];
            let right = &views[*right_name];
            for (key_a, _) in left.entries() {
                for (key_b, _) in right.entries() {
                    if key_a == key_b {
                        continue;
                    }
                    let score = similarity(key_a, key_b);
                    if score < threshold || score >= 1.0 {
                        continue;
                    }
                    let pair = if key_a <= key_b {
                        (key_a.clone(), key_b.clone())
                    } else {
                        (key_b.clone(), key_a.clone())
                    };
                    if !seen.insert(pair) {
                        continue;
                    }
                    let mut display_names = left.display_names_for(key_a);
                    display_names.extend(right.display_names_for(key_b));
                    out.push(Discrepancy {
                        kind: DiscrepancyKind::PossibleMisspelling,
                        rule: "possible_misspellings".to_string(),
                        collections: vec![left.name.clone(), right.name.clone()],
                        key: key_a.clone(),
                        display_names,
                        token: None,
                        suggestion: Some(Suggestion {
                            display_name: right.display_names_for(key_b).swap_remove(0),
                            collection: right.name.clone(),
                            score,
                        }),
                        totals: None,
                    });
                }
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

/// Load CSV rows into RawRecords, applying the collection's column mapping.
/// Rows with an empty display name are skipped.
pub fn load_csv_rows(
    collection: &str,
    csv_data: &str,
    config: &CollectionConfig,
) -> Result<Vec<RawRecord>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, ReconError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReconError::MissingColumn {
                collection: collection.into(),
                column: name.into(),
            })
    };

    let columns = &config.columns;
    let display_idx = idx(&columns.display_name)?;
    let notes_idx = columns.notes.as_deref().map(idx).transpose()?;
    let headcount_idx = columns.headcount.as_deref().map(idx).transpose()?;

    let mut rows = Vec::new();
    for (seq, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;

        let display_name = record.get(display_idx).unwrap_or("").trim().to_string();
        if display_name.is_empty() {
            continue;
        }

        let field = |i: Option<usize>| {
            i.and_then(|i| record.get(i))
                .unwrap_or("")
                .trim()
                .to_string()
        };

        rows.push(RawRecord {
            collection: collection.into(),
            display_name,
            notes: field(notes_idx),
            headcount_field: field(headcount_idx),
            seq,
        });
    }

    Ok(rows)
}
