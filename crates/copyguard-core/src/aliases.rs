use crate::normalize::normalize_text;

/// Separators that join several aliases inside one catalog cell.
const ALIAS_DELIMITERS: &[char] = &[
    '\n', '\r', ',', ';', '/', '\\', '|', // ASCII
    '\u{FF0C}', // ，
    '\u{3001}', // 、
    '\u{FF1B}', // ；
    '\u{FF0F}', // ／
    '\u{FF3C}', // ＼
    '\u{FF5C}', // ｜
];

/// Split one raw alias field into individual, normalized aliases.
///
/// Order is preserved; empty segments are dropped.
pub fn split_aliases(raw: &str) -> Vec<String> {
    raw.split(ALIAS_DELIMITERS)
        .map(normalize_text)
        .filter(|s| !s.is_empty())
        .collect()
}
