use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ReconError;
use crate::matcher::DEFAULT_SIMILARITY_THRESHOLD;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    pub collections: HashMap<String, CollectionConfig>,
    /// Ordered rule list; report output is grouped by rule in this order.
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    pub file: String,
    pub columns: ColumnMapping,
}

/// Maps source CSV headers onto record fields. Only the display-name column
/// is required; lists without notes or headcount columns are common.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    pub display_name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub headcount: Option<String>,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A relationship expected to hold between named collections.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfig {
    /// Every identity in `subject` must match one in `reference`.
    SubsetOf { subject: String, reference: String },
    /// `left` union `right`, deduplicated by identity, must equal
    /// `whole` minus `exclusion`.
    PartitionEquals {
        left: String,
        right: String,
        whole: String,
        #[serde(default)]
        exclusion: Option<String>,
    },
    /// No identity may appear in both `left` and `right`.
    Disjoint { left: String, right: String },
    /// No two records in `collection` may share a normalized key.
    NoInternalDuplicates { collection: String },
    /// Every party token in `collection` must carry a last name.
    CompleteNames { collection: String },
    /// Entries in `subject` must keep the honorific title their `reference`
    /// counterpart carries.
    TitlesMatch { subject: String, reference: String },
    /// Resolved headcount totals must agree for identities on both sides.
    HeadcountMatches { left: String, right: String },
}

impl RuleConfig {
    /// Stable label used to group report output.
    pub fn label(&self) -> String {
        match self {
            Self::SubsetOf { subject, reference } => {
                format!("subset_of({subject}, {reference})")
            }
            Self::PartitionEquals {
                left,
                right,
                whole,
                exclusion,
            } => match exclusion {
                Some(excl) => {
                    format!("partition_equals({left} + {right}, {whole} - {excl})")
                }
                None => format!("partition_equals({left} + {right}, {whole})"),
            },
            Self::Disjoint { left, right } => format!("disjoint({left}, {right})"),
            Self::NoInternalDuplicates { collection } => {
                format!("no_internal_duplicates({collection})")
            }
            Self::CompleteNames { collection } => format!("complete_names({collection})"),
            Self::TitlesMatch { subject, reference } => {
                format!("titles_match({subject}, {reference})")
            }
            Self::HeadcountMatches { left, right } => {
                format!("headcount_matches({left}, {right})")
            }
        }
    }

    /// Collections this rule reads.
    pub fn collection_refs(&self) -> Vec<&str> {
        match self {
            Self::SubsetOf { subject, reference } => vec![subject, reference],
            Self::PartitionEquals {
                left,
                right,
                whole,
                exclusion,
            } => {
                let mut refs = vec![left.as_str(), right.as_str(), whole.as_str()];
                if let Some(excl) = exclusion {
                    refs.push(excl);
                }
                refs
            }
            Self::Disjoint { left, right } => vec![left, right],
            Self::NoInternalDuplicates { collection } => vec![collection],
            Self::CompleteNames { collection } => vec![collection],
            Self::TitlesMatch { subject, reference } => vec![subject, reference],
            Self::HeadcountMatches { left, right } => vec![left, right],
        }
    }
}

// ---------------------------------------------------------------------------
// Matching + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.collections.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least 1 collection is required".into(),
            ));
        }

        let threshold = self.matching.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ReconError::ConfigValidation(format!(
                "similarity_threshold must be in (0, 1], got {threshold}"
            )));
        }

        // Every rule must reference declared collections
        for rule in &self.rules {
            for name in rule.collection_refs() {
                if !self.collections.contains_key(name) {
                    return Err(ReconError::UnknownCollection(format!(
                        "rule '{}': collection '{name}' not found",
                        rule.label()
                    )));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "Guest Lists"

[collections.master]
file = "master.csv"
[collections.master.columns]
display_name = "Full Name"
notes        = "Notes"
headcount    = "Headcount"

[collections.bride_attendees]
file = "bride-attendees.csv"
[collections.bride_attendees.columns]
display_name = "Full Name"

[[rules]]
kind = "subset_of"
subject = "bride_attendees"
reference = "master"

[[rules]]
kind = "no_internal_duplicates"
collection = "master"

[matching]
similarity_threshold = 0.85
"#;

    #[test]
    fn parse_valid_config() {
        let config = ReconConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Guest Lists");
        assert_eq!(config.collections.len(), 2);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.matching.similarity_threshold, 0.85);
        assert!(config.output.json.is_none());

        let master = &config.collections["master"];
        assert_eq!(master.columns.display_name, "Full Name");
        assert_eq!(master.columns.notes.as_deref(), Some("Notes"));

        let bride = &config.collections["bride_attendees"];
        assert!(bride.columns.notes.is_none());
        assert!(bride.columns.headcount.is_none());
    }

    #[test]
    fn threshold_defaults_when_absent() {
        let input = VALID.replace("[matching]\nsimilarity_threshold = 0.85\n", "");
        let config = ReconConfig::from_toml(&input).unwrap();
        assert_eq!(config.matching.similarity_threshold, 0.85);
    }

    #[test]
    fn parse_all_rule_kinds() {
        let input = r#"
name = "All Rules"

[collections.a]
file = "a.csv"
[collections.a.columns]
display_name = "Full Name"

[collections.b]
file = "b.csv"
[collections.b.columns]
display_name = "Full Name"

[collections.c]
file = "c.csv"
[collections.c.columns]
display_name = "Full Name"

[collections.d]
file = "d.csv"
[collections.d.columns]
display_name = "Full Name"

[[rules]]
kind = "subset_of"
subject = "a"
reference = "b"

[[rules]]
kind = "partition_equals"
left = "a"
right = "b"
whole = "c"
exclusion = "d"

[[rules]]
kind = "disjoint"
left = "a"
right = "b"

[[rules]]
kind = "no_internal_duplicates"
collection = "a"

[[rules]]
kind = "complete_names"
collection = "a"

[[rules]]
kind = "titles_match"
subject = "a"
reference = "c"

[[rules]]
kind = "headcount_matches"
left = "c"
right = "a"
"#;
        let config = ReconConfig::from_toml(input).unwrap();
        assert_eq!(config.rules.len(), 7);
        assert_eq!(config.rules[0].label(), "subset_of(a, b)");
        assert_eq!(
            config.rules[1].label(),
            "partition_equals(a + b, c - d)"
        );
        assert_eq!(config.rules[1].collection_refs(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn reject_unknown_collection_in_rule() {
        let input = r#"
name = "Bad"

[collections.a]
file = "a.csv"
[collections.a.columns]
display_name = "Full Name"

[[rules]]
kind = "subset_of"
subject = "a"
reference = "nope"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("'nope'"));
    }

    #[test]
    fn reject_empty_collections() {
        let input = r#"
name = "Bad"
collections = {}
rules = []
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("at least 1 collection"));
    }

    #[test]
    fn reject_bad_threshold() {
        let input = VALID.replace("similarity_threshold = 0.85", "similarity_threshold = 1.5");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("similarity_threshold"));
    }

    #[test]
    fn reject_unknown_rule_kind() {
        let input = r#"
name = "Bad"

[collections.a]
file = "a.csv"
[collections.a.columns]
display_name = "Full Name"

[[rules]]
kind = "superset_of"
subject = "a"
reference = "a"
"#;
        assert!(ReconConfig::from_toml(input).is_err());
    }
}
