//! Accessible-name canonicalization.
//!
//! Two names are "the same" exactly when their normalized forms are equal.

use std::sync::LazyLock;

use fancy_regex::Regex;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Trim, collapse whitespace runs to one space, case-fold, then NFC-compose.
pub fn normalize(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let collapsed = WHITESPACE_RUN.replace_all(trimmed, " ");
    case_fold(&collapsed).nfc().collect()
}

/// `None` normalizes like the empty string.
pub fn normalize_opt(s: Option<&str>) -> String {
    s.map(normalize).unwrap_or_default()
}

/// Lowercase plus the full case foldings that lowercasing leaves alone:
/// sharp s, final sigma, long s, Greek symbol variants and the Latin and
/// Armenian presentation ligatures. Foldings that only differ by a combining
/// mark (e.g. `ǰ`) are left to NFC, which recomposes them anyway; Greek
/// iota-subscript expansions are not applied.
fn case_fold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars().flat_map(char::to_lowercase) {
        match full_fold(ch) {
            Some(folded) => out.push_str(folded),
            None => out.push(ch),
        }
    }
    out
}

fn full_fold(ch: char) -> Option<&'static str> {
    let folded = match ch {
        'ß' => "ss",
        'ς' => "σ",
        'ſ' => "s",
        'ŉ' => "ʼn",
        'ϐ' => "β",
        'ϑ' => "θ",
        'ϕ' => "φ",
        'ϖ' => "π",
        'ϰ' => "κ",
        'ϱ' => "ρ",
        'ϵ' => "ε",
        'ﬀ' => "ff",
        'ﬁ' => "fi",
        'ﬂ' => "fl",
        'ﬃ' => "ffi",
        'ﬄ' => "ffl",
        'ﬅ' | 'ﬆ' => "st",
        'և' => "եւ",
        'ﬓ' => "մն",
        'ﬔ' => "մե",
        'ﬕ' => "մի",
        'ﬖ' => "վն",
        'ﬗ' => "մխ",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_collapses_and_lowercases() {
        assert_eq!(normalize("  About \t\n Us  "), "about us");
        assert_eq!(normalize("HOME"), "home");
    }

    #[test]
    fn empty_and_whitespace_only_become_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \u{00A0}\n\t "), "");
        assert_eq!(normalize_opt(None), "");
    }

    #[test]
    fn folds_beyond_ascii() {
        assert_eq!(normalize("STRASSE"), normalize("Straße"));
        assert_eq!(normalize("ΣΟΦΟΣ"), normalize("σοφος"));
        assert_eq!(normalize("ÉCOLE"), "école");
        assert_eq!(normalize("Привет Мир"), "привет мир");
    }

    #[test]
    fn ligatures_and_symbol_variants_fold() {
        assert_eq!(normalize("\u{FB01}le \u{FB00}ect"), "file ffect");
        assert_eq!(normalize("O\u{FB03}ce"), normalize("OFFICE"));
        assert_eq!(normalize("Me\u{017F}\u{017F}"), "mess");
        assert_eq!(normalize("\u{03D1}\u{03F5}"), "θε");
    }

    #[test]
    fn composed_and_decomposed_forms_match() {
        assert_eq!(normalize("Cafe\u{0301}"), normalize("Caf\u{00E9}"));
    }

    #[test]
    fn unicode_whitespace_is_collapsed() {
        assert_eq!(normalize("Next\u{00A0}\u{2003}page"), "next page");
    }

    #[test]
    fn is_idempotent_on_samples() {
        for sample in ["  Mixed  CASE ", "Straße", "İstanbul", "a\u{0301}\u{0301}", "ǅ", "\u{FB03}", "\u{0587}", ""] {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "sample {sample:?}");
        }
    }
}
