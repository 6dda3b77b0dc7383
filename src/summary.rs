use std::collections::HashMap;

use crate::model::{Discrepancy, DiscrepancyKind, ReconSummary, SkippedRule};

/// Compute summary statistics from a discrepancy list.
pub fn compute_summary(discrepancies: &[Discrepancy], skipped: &[SkippedRule]) -> ReconSummary {
    let mut kind_counts: HashMap<String, usize> = HashMap::new();
    let mut duplicates = 0;
    let mut missing = 0;
    let mut extras = 0;
    let mut name_format_issues = 0;
    let mut possible_misspellings = 0;
    let mut headcount_mismatches = 0;

    for d in discrepancies {
        *kind_counts.entry(d.kind.to_string()).or_insert(0) += 1;

        match d.kind {
            DiscrepancyKind::DuplicateWithinCollection => duplicates += 1,
            DiscrepancyKind::MissingFromReference => missing += 1,
            DiscrepancyKind::ExtraBeyondReference => extras += 1,
            DiscrepancyKind::MissingLastName | DiscrepancyKind::MissingTitle => {
                name_format_issues += 1
            }
            DiscrepancyKind::PossibleMisspelling => possible_misspellings += 1,
            DiscrepancyKind::HeadcountMismatch => headcount_mismatches += 1,
        }
    }

    ReconSummary {
        total_discrepancies: discrepancies.len(),
        duplicates,
        missing,
        extras,
        name_format_issues,
        possible_misspellings,
        headcount_mismatches,
        skipped_rules: skipped.len(),
        kind_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn discrepancy(kind: DiscrepancyKind) -> Discrepancy {
        Discrepancy {
            kind,
            rule: "test".into(),
            collections: vec!["a".into()],
            key: normalize("Test Name"),
            display_names: vec!["Test Name".into()],
            token: None,
            suggestion: None,
            totals: None,
        }
    }

    #[test]
    fn summary_counts() {
        let discrepancies = vec![
            discrepancy(DiscrepancyKind::DuplicateWithinCollection),
            discrepancy(DiscrepancyKind::MissingFromReference),
            discrepancy(DiscrepancyKind::MissingFromReference),
            discrepancy(DiscrepancyKind::MissingLastName),
            discrepancy(DiscrepancyKind::MissingTitle),
            discrepancy(DiscrepancyKind::PossibleMisspelling),
            discrepancy(DiscrepancyKind::HeadcountMismatch),
        ];
        let summary = compute_summary(&discrepancies, &[]);
        assert_eq!(summary.total_discrepancies, 7);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.missing, 2);
        assert_eq!(summary.extras, 0);
        assert_eq!(summary.name_format_issues, 2);
        assert_eq!(summary.possible_misspellings, 1);
        assert_eq!(summary.headcount_mismatches, 1);
        assert_eq!(summary.kind_counts["missing_from_reference"], 2);
    }

    #[test]
    fn summary_tracks_skipped_rules() {
        let skipped = vec![SkippedRule {
            rule: "subset_of(a, b)".into(),
            missing_collections: vec!["b".into()],
        }];
        let summary = compute_summary(&[], &skipped);
        assert_eq!(summary.total_discrepancies, 0);
        assert_eq!(summary.skipped_rules, 1);
    }
}
