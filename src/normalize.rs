use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::NormalizedKey;

/// Honorific/title prefixes recognized at the start of a name.
/// "Untle" is a known misspelling in the source lists, tolerated on purpose.
static TITLE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:uncle|auntie|aunt|nino|nina|untle|fr\.)\s+").unwrap());

/// A title token anywhere in the name, for presence checks.
static TITLE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:uncle|auntie|aunt|nino|nina|untle|fr\.)").unwrap());

/// Trailing "& Guest", "and Guests", including anything after.
static GUEST_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\s*&\s*|\s+and\s+)guests?\b.*$").unwrap());

/// Trailing "and Family" / "Family". Requires leading whitespace so a bare
/// "Family" token survives (it is retained for counting).
static FAMILY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\s+and)?\s+family\b.*$").unwrap());

/// Trailing "+N" fragment, e.g. "+1", "+2 kids".
static PLUS_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\+\d+.*$").unwrap());

/// Parenthetical notes, e.g. "(off-island)".
static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());

/// Conjunction markers separating members of a composite party.
/// "and" only splits as a standalone word; "&" splits with or without spaces.
static CONJUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*&\s*|\s+and\s+").unwrap());

/// Canonicalize a raw display name into a comparison key.
///
/// Lowercased, whitespace-collapsed, with the leading title, trailing
/// guest/family/"+N" suffixes, and parenthetical notes stripped. An empty
/// result is never a valid identity and is excluded from set operations.
pub fn normalize(raw: &str) -> NormalizedKey {
    let s = TITLE_PREFIX.replace(raw.trim(), "");
    let s = GUEST_SUFFIX.replace(&s, "");
    let s = FAMILY_SUFFIX.replace(&s, "");
    let s = PLUS_SUFFIX.replace(&s, "");
    let s = PARENTHETICAL.replace_all(&s, " ");
    let collapsed: Vec<&str> = s.split_whitespace().collect();
    NormalizedKey::new(collapsed.join(" ").to_lowercase())
}

/// Decompose an "A & B"-style composite entry into constituent person names.
///
/// Each token is independently stripped of a leading title and of trailing
/// guest/family/"+N"/parenthetical fragments. Tokens that become empty are
/// dropped. Original casing is preserved.
pub fn split_party(raw: &str) -> Vec<String> {
    CONJUNCTION
        .split(raw)
        .filter_map(|part| {
            let s = TITLE_PREFIX.replace(part.trim(), "");
            let s = GUEST_SUFFIX.replace(&s, "");
            let s = FAMILY_SUFFIX.replace(&s, "");
            let s = PLUS_SUFFIX.replace(&s, "");
            let s = PARENTHETICAL.replace_all(&s, " ");
            let words: Vec<&str> = s.split_whitespace().collect();
            if words.is_empty() {
                None
            } else {
                Some(words.join(" "))
            }
        })
        .collect()
}

/// Whether a party token appears to carry a last name: at least two words
/// once the title prefix and parenthetical notes are removed.
pub fn has_last_name(token: &str) -> bool {
    let s = TITLE_PREFIX.replace(token.trim(), "");
    let s = PARENTHETICAL.replace_all(&s, " ");
    s.split_whitespace().count() >= 2
}

/// Whether the display name carries an honorific title anywhere.
pub fn has_title(name: &str) -> bool {
    TITLE_WORD.is_match(name)
}

/// Tokens that stand in for unnamed attendees. Excluded from last-name
/// checks but retained for counting.
pub fn is_placeholder_token(token: &str) -> bool {
    token.eq_ignore_ascii_case("guest") || token.eq_ignore_ascii_case("family")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_title_prefix() {
        assert_eq!(normalize("Uncle Bob Smith").as_str(), "bob smith");
        assert_eq!(normalize("Auntie Carol Reyes").as_str(), "carol reyes");
        assert_eq!(normalize("Fr. Miguel Santos").as_str(), "miguel santos");
        assert_eq!(normalize("Untle Joe Cruz").as_str(), "joe cruz");
    }

    #[test]
    fn strips_guest_and_family_suffixes() {
        assert_eq!(normalize("John Smith & Guest").as_str(), "john smith");
        assert_eq!(normalize("John Smith and Guests").as_str(), "john smith");
        assert_eq!(normalize("Dela Cruz and Family").as_str(), "dela cruz");
        assert_eq!(normalize("Reyes Family").as_str(), "reyes");
    }

    #[test]
    fn strips_plus_and_parentheticals() {
        assert_eq!(normalize("Ana Lopez +2").as_str(), "ana lopez");
        assert_eq!(normalize("Ana Lopez (off-island)").as_str(), "ana lopez");
        assert_eq!(normalize("Ana  Lopez   (maybe) +1").as_str(), "ana lopez");
    }

    #[test]
    fn empty_and_whitespace_normalize_to_empty() {
        assert!(normalize("").is_empty());
        assert!(normalize("   ").is_empty());
        assert!(normalize("(tbd)").is_empty());
    }

    #[test]
    fn normalize_is_idempotent_on_real_inputs() {
        let samples = [
            "Uncle Bob Smith",
            "John Smith & Guest",
            "Dela Cruz and Family",
            "Ana Lopez +2",
            "Maria Santos & Jose Cruz",
            "Fr. Miguel Santos (officiant)",
            "  Spaced   Out  ",
        ];
        for raw in samples {
            let once = normalize(raw);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn splits_composite_parties() {
        assert_eq!(split_party("John & Jane Smith"), vec!["John", "Jane Smith"]);
        assert_eq!(split_party("John and Jane Smith"), vec!["John", "Jane Smith"]);
        assert_eq!(split_party("Uncle Bob"), vec!["Bob"]);
        assert_eq!(split_party("Maria Santos & Jose Cruz"), vec!["Maria Santos", "Jose Cruz"]);
    }

    #[test]
    fn split_does_not_break_inside_words() {
        // "and" inside a word must not split
        assert_eq!(split_party("Alexandra Reyes"), vec!["Alexandra Reyes"]);
        assert_eq!(split_party("Brandon Cruz"), vec!["Brandon Cruz"]);
    }

    #[test]
    fn split_retains_placeholder_tokens() {
        // The conjunction splits before the suffix strip can see "& Guest",
        // so the placeholder survives as its own token, retained for counts.
        let tokens = split_party("John Smith & Guest");
        assert_eq!(tokens, vec!["John Smith", "Guest"]);
        assert!(is_placeholder_token(&tokens[1]));

        let tokens = split_party("Smith and Family");
        assert_eq!(tokens, vec!["Smith", "Family"]);
        assert!(is_placeholder_token(&tokens[1]));
    }

    #[test]
    fn split_empty_input() {
        assert!(split_party("").is_empty());
    }

    #[test]
    fn last_name_detection() {
        assert!(has_last_name("Jane Smith"));
        assert!(has_last_name("Uncle Bob Smith"));
        assert!(!has_last_name("Jane"));
        assert!(!has_last_name("Uncle Bob"));
        assert!(!has_last_name("Ana (maybe)"));
    }

    #[test]
    fn title_detection() {
        assert!(has_title("Uncle Bob Smith"));
        assert!(has_title("Fr. Miguel Santos"));
        assert!(!has_title("Bob Smith"));
    }
}
