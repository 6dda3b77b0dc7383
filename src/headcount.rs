//! Headcount resolution.
//!
//! The source lists encode counts three ways: a "+P,T" headcount cell
//! (P plus-ones out of T total), a bare total, or nothing at all, with
//! plus-ones sometimes noted separately as "+N" in the notes column. This
//! module is the single authoritative precedence chain for all of them.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::HeadcountTriple;

static PLUS_TOTAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+(\d+),(\d+)").unwrap());
static BARE_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)$").unwrap());
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static NOTES_PLUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+(\d+)").unwrap());
static AND_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\band\b").unwrap());
static FAMILY_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfamily\b").unwrap());

/// Derive `(base, plus_ones, total)` for one record. Never fails; malformed
/// input falls through the chain to a best-effort triple.
///
/// Precedence, first applicable rule wins:
/// 1. headcount field matches `+P,T`: base = T-P, plus_ones = P, total = T.
/// 2. headcount field is a bare integer T: (T, 0, T).
/// 3. headcount field contains digits: last digit run is T, (T, 0, T).
///    Deliberately lenient; kept for parity with the source data.
/// 4. no usable headcount field: infer base from the display name (2 for a
///    conjunction, 4 for "family", else 1) and plus_ones from the notes
///    field's first "+N".
///
/// When rules 1-3 fire, the notes field is ignored here: a caller combining
/// a field-derived total with [`plus_ones_from_notes`] must pick one
/// derivation path per record, never both.
pub fn resolve(headcount_field: &str, notes: &str, display_name: &str) -> HeadcountTriple {
    let field = headcount_field.trim();

    if let Some(caps) = PLUS_TOTAL.captures(field) {
        let plus_ones: u32 = caps[1].parse().unwrap_or(0);
        let total: u32 = caps[2].parse().unwrap_or(0);
        return HeadcountTriple::from_total(total, plus_ones);
    }

    if let Some(caps) = BARE_INT.captures(field) {
        let total: u32 = caps[1].parse().unwrap_or(0);
        return HeadcountTriple::from_total(total, 0);
    }

    if let Some(m) = DIGIT_RUN.find_iter(field).last() {
        let total: u32 = m.as_str().parse().unwrap_or(0);
        return HeadcountTriple::from_total(total, 0);
    }

    let base = if display_name.contains('&') || AND_WORD.is_match(display_name) {
        2
    } else if FAMILY_WORD.is_match(display_name) {
        4
    } else {
        1
    };
    HeadcountTriple::new(base, plus_ones_from_notes(notes))
}

/// First "+N" in a notes field, 0 if absent.
pub fn plus_ones_from_notes(notes: &str) -> u32 {
    NOTES_PLUS
        .captures(notes)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(base: u32, plus_ones: u32, total: u32) -> HeadcountTriple {
        HeadcountTriple {
            base,
            plus_ones,
            total,
        }
    }

    #[test]
    fn plus_total_pattern() {
        assert_eq!(resolve("+2,4", "", "X"), triple(2, 2, 4));
        assert_eq!(resolve("+1,3", "+9", "X"), triple(2, 1, 3)); // notes ignored
    }

    #[test]
    fn bare_integer() {
        assert_eq!(resolve("5", "", "X"), triple(5, 0, 5));
        assert_eq!(resolve(" 3 ", "", "X"), triple(3, 0, 3));
    }

    #[test]
    fn last_digit_run_fallback() {
        assert_eq!(resolve("about 3, maybe 5", "", "X"), triple(5, 0, 5));
        assert_eq!(resolve("2 adults 1 kid", "", "X"), triple(1, 0, 1));
    }

    #[test]
    fn inference_from_display_name() {
        assert_eq!(resolve("", "+1", "John & Jane"), triple(2, 1, 3));
        assert_eq!(resolve("", "", "John and Jane"), triple(2, 0, 2));
        assert_eq!(resolve("", "", "Smith Family"), triple(4, 0, 4));
        assert_eq!(resolve("", "", "Bob"), triple(1, 0, 1));
    }

    #[test]
    fn and_must_be_a_standalone_word() {
        // "Alexandra" and "Brandon" contain "and" but are single guests
        assert_eq!(resolve("", "", "Alexandra Reyes"), triple(1, 0, 1));
        assert_eq!(resolve("", "", "Brandon Cruz"), triple(1, 0, 1));
    }

    #[test]
    fn malformed_plus_total_clamps() {
        // plus ones exceed total: base clamps to zero, invariant holds
        let t = resolve("+5,3", "", "X");
        assert_eq!(t.base + t.plus_ones, t.total);
        assert_eq!(t.base, 0);
        assert_eq!(t.total, 3);
    }

    #[test]
    fn notes_plus_one_extraction() {
        assert_eq!(plus_ones_from_notes("+2"), 2);
        assert_eq!(plus_ones_from_notes("bringing +1 maybe"), 1);
        assert_eq!(plus_ones_from_notes("confirmed"), 0);
        assert_eq!(plus_ones_from_notes(""), 0);
    }
}
