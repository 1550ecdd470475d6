//! Text normalization for catalog titles, aliases and candidate video titles.
//!
//! Two forms are produced:
//!
//! - [`normalize_text`]: the display-preserving canonical form (NFKC,
//!   unified apostrophes, collapsed whitespace). Aliases are stored and
//!   searched in this form.
//! - [`normalize_for_match`]: the match key (case-folded, punctuation
//!   stripped). Alias deduplication, equality and substring checks all run
//!   on this form, so two spellings of the same title that differ only by
//!   case, punctuation or spacing must fold to the same key.

use unicode_normalization::UnicodeNormalization;

/// Apostrophe and quote look-alikes folded into a plain `'`.
const APOSTROPHES: &[char] = &[
    '\u{2019}', // ’
    '`',
    '\u{00B4}', // ´
    '\u{2018}', // ‘
    '\u{02BB}', // ʻ
];

/// Characters replaced by a space in the match key.
const MATCH_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '-', '_', '/', '\\', '(', ')', '[', ']', '{', '}', '|', '*',
    '^', '$', '`', '~', '"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '\u{00B7}',
];

/// Canonicalize a raw string.
///
/// Steps, in order:
/// 1. Unicode NFKC (full-width Latin → ASCII, compatibility forms folded)
/// 2. Apostrophe unification
/// 3. Whitespace collapse and trim
pub fn normalize_text(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let s = unicode_normalize(s);
    let s = unify_apostrophes(&s);
    collapse_whitespace(&s)
}

/// Build the match key for a string.
///
/// Builds on [`normalize_text`], then case-folds, turns the ideographic
/// space into a regular one, replaces [`MATCH_PUNCTUATION`] with spaces and
/// collapses whitespace again. Case folding is a no-op for CJK, Thai and
/// Hangul.
pub fn normalize_for_match(s: &str) -> String {
    let s = normalize_text(s);
    if s.is_empty() {
        return s;
    }
    let s = case_fold(&s);
    let s = erase_punctuation(&s);
    collapse_whitespace(&s)
}

// ── Level 1: Unicode NFKC ─────────────────────────────────────────────

fn unicode_normalize(s: &str) -> String {
    s.nfkc().collect()
}

// ── Level 2: Apostrophes ──────────────────────────────────────────────

fn unify_apostrophes(s: &str) -> String {
    s.chars()
        .map(|c| if APOSTROPHES.contains(&c) { '\'' } else { c })
        .collect()
}

// ── Level 3: Case folding (match key only) ────────────────────────────

/// Lowercase plus the full case folds that lowercasing alone misses.
fn case_fold(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        match c {
            '\u{00DF}' => result.push_str("ss"), // ß
            '\u{03C2}' => result.push('\u{03C3}'), // ς → σ
            c => result.push(c),
        }
    }
    result
}

// ── Level 3b: Punctuation erasure (match key only) ─────────────────────

fn erase_punctuation(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c == '\u{3000}' || MATCH_PUNCTUATION.contains(&c) {
                ' '
            } else {
                c
            }
        })
        .collect()
}

// ── Level 4: Whitespace collapse ──────────────────────────────────────

/// Trim and collapse whitespace runs to a single space.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether every character of `s` is ASCII.
pub fn is_ascii(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii())
}

/// Number of Unicode scalar values in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── normalize_text ────────────────────────────────────────────────

    #[test]
    fn fullwidth_latin_folds_to_ascii() {
        assert_eq!(normalize_text("ＭＯＯＮＬＩＧＨＴ"), "MOONLIGHT");
    }

    #[test]
    fn apostrophe_variants() {
        assert_eq!(normalize_text("it\u{2019}s"), "it's");
        assert_eq!(normalize_text("it`s"), "it's");
        assert_eq!(normalize_text("it\u{2018}s"), "it's");
        assert_eq!(normalize_text("it\u{02BB}s"), "it's");
    }

    #[test]
    fn whitespace_collapse_and_trim() {
        assert_eq!(normalize_text("  My \t Show \n  2  "), "My Show 2");
    }

    #[test]
    fn ideographic_space_is_folded_by_nfkc() {
        assert_eq!(normalize_text("月光\u{3000}传说"), "月光 传说");
    }

    #[test]
    fn case_is_preserved() {
        assert_eq!(normalize_text("Moonlight Legend"), "Moonlight Legend");
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   "), "");
    }

    // ── normalize_for_match ───────────────────────────────────────────

    #[test]
    fn fold_equivalence() {
        assert_eq!(
            normalize_for_match("Hello, World!"),
            normalize_for_match("hello world")
        );
        assert_eq!(normalize_for_match("Hello, World!"), "hello world");
    }

    #[test]
    fn punctuation_becomes_space() {
        assert_eq!(normalize_for_match("Love/Hate (2024)"), "love hate 2024");
        assert_eq!(normalize_for_match("Don't Stop"), "don t stop");
        assert_eq!(normalize_for_match("a·b"), "a b");
    }

    #[test]
    fn cjk_is_untouched() {
        assert_eq!(normalize_for_match("月光传说"), "月光传说");
        assert_eq!(normalize_for_match("달빛 전설"), "달빛 전설");
        assert_eq!(normalize_for_match("แสงจันทร์"), "แสงจันทร์");
    }

    #[test]
    fn thai_sara_am_is_decomposed_by_nfkc() {
        assert_eq!(normalize_text("ตำนาน"), "ต\u{0E4D}\u{0E32}นาน");
        assert_eq!(normalize_for_match("ตำนาน"), normalize_for_match("ต\u{0E4D}\u{0E32}นาน"));
    }

    #[test]
    fn full_case_folding() {
        assert_eq!(normalize_for_match("STRASSE"), normalize_for_match("Straße"));
        assert_eq!(normalize_for_match("Die Straße"), "die strasse");
        assert_eq!(normalize_for_match("ẞ"), "ss");
        assert_eq!(normalize_for_match("ΟΔΟΣ"), normalize_for_match("οδος"));
    }

    #[test]
    fn fullwidth_punctuation_is_stripped() {
        // NFKC turns the full-width comma and parentheses into ASCII first.
        assert_eq!(normalize_for_match("月光，传说（完整版）"), "月光 传说 完整版");
    }

    #[test]
    fn only_punctuation_is_empty() {
        assert_eq!(normalize_for_match("-- ! --"), "");
    }

    #[test]
    fn idempotence() {
        let samples = [
            "Hello, World!",
            "  ＦＵＬＬ　ＨＤ  ",
            "It\u{2019}s a “Legend” · Part 2",
            "月光传说 第1集",
            "Capítulo 1 – Épisode",
            "ตอนที่ 1",
            "",
            "\u{00B4}",
        ];
        for s in samples {
            let once = normalize_text(s);
            assert_eq!(normalize_text(&once), once, "normalize_text({s:?})");
            let once = normalize_for_match(s);
            assert_eq!(normalize_for_match(&once), once, "normalize_for_match({s:?})");
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────

    #[test]
    fn char_len_counts_scalars() {
        assert_eq!(char_len("月光传说"), 4);
        assert_eq!(char_len("abc"), 3);
    }

    #[test]
    fn ascii_detection() {
        assert!(is_ascii("ML"));
        assert!(!is_ascii("月光"));
    }
}
