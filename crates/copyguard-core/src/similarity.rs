//! Text similarity between match-folded titles.
//!
//! Every measure is on a 0–100 scale where 100 means identical. The scorer
//! takes the best of three measures so that truncated, reordered and
//! decorated titles are each caught by at least one of them.

use serde::{Deserialize, Serialize};

/// A partial-ratio window at or above this score ends the scan early.
const PARTIAL_EARLY_EXIT: f64 = 99.0;

/// Normalized edit similarity between two strings.
///
/// Implementors provide [`Similarity::ratio`]; the composite measures are
/// derived from it so every backend combines them the same way.
pub trait Similarity: Send + Sync {
    /// Full-string similarity, 0–100.
    fn ratio(&self, a: &str, b: &str) -> f64;

    /// Best [`ratio`](Similarity::ratio) of the shorter string against any
    /// same-length window of the longer one.
    fn partial_ratio(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let a_chars: Vec<char> = a.chars().collect();
        let b_chars: Vec<char> = b.chars().collect();
        let (long, short) = if a_chars.len() < b_chars.len() {
            (b_chars, a_chars)
        } else {
            (a_chars, b_chars)
        };

        let short: String = short.iter().collect();
        let window = short.chars().count();
        let mut best: f64 = 0.0;
        for start in 0..=(long.len() - window) {
            let segment: String = long[start..start + window].iter().collect();
            best = best.max(self.ratio(&segment, &short));
            if best >= PARTIAL_EARLY_EXIT {
                break;
            }
        }
        best
    }

    /// [`ratio`](Similarity::ratio) after sorting each string's tokens.
    fn token_sort_ratio(&self, a: &str, b: &str) -> f64 {
        let a_sorted = sorted_tokens(a);
        let b_sorted = sorted_tokens(b);
        if a_sorted.is_empty() || b_sorted.is_empty() {
            return self.ratio(a, b);
        }
        self.ratio(&a_sorted, &b_sorted)
    }

    /// Maximum of the direct, partial and token-sort measures.
    fn best(&self, a: &str, b: &str) -> f64 {
        self.ratio(a, b)
            .max(self.partial_ratio(a, b))
            .max(self.token_sort_ratio(a, b))
    }
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

// ── Indel (LCS) backend ───────────────────────────────────────────────

/// Longest-common-subsequence ratio: `2 · LCS / (|a| + |b|) · 100`.
///
/// Pure implementation with no external matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndelRatio;

impl Similarity for IndelRatio {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let total = a.len() + b.len();
        if total == 0 {
            return 100.0;
        }
        let lcs = lcs_len(&a, &b);
        (2 * lcs) as f64 / total as f64 * 100.0
    }
}

/// Length of the longest common subsequence, two-row dynamic program.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

// ── Levenshtein backend ───────────────────────────────────────────────

/// Normalized Levenshtein similarity from `strsim`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenshteinRatio;

impl Similarity for LevenshteinRatio {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b) * 100.0
    }
}

// ── Backend selection ─────────────────────────────────────────────────

static INDEL: IndelRatio = IndelRatio;
static LEVENSHTEIN: LevenshteinRatio = LevenshteinRatio;

/// Which [`Similarity`] implementation the scorer uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityBackend {
    #[default]
    Indel,
    Levenshtein,
}

impl SimilarityBackend {
    pub fn similarity(self) -> &'static dyn Similarity {
        match self {
            Self::Indel => &INDEL,
            Self::Levenshtein => &LEVENSHTEIN,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indel => "indel",
            Self::Levenshtein => "levenshtein",
        }
    }
}

impl std::fmt::Display for SimilarityBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKENDS: &[SimilarityBackend] = &[SimilarityBackend::Indel, SimilarityBackend::Levenshtein];

    #[test]
    fn test_identical_is_100() {
        for backend in BACKENDS {
            let s = backend.similarity();
            assert_eq!(s.ratio("moonlight legend", "moonlight legend"), 100.0, "{backend}");
            assert_eq!(s.best("月光传说", "月光传说"), 100.0, "{backend}");
        }
    }

    #[test]
    fn test_disjoint_is_0() {
        for backend in BACKENDS {
            assert_eq!(backend.similarity().ratio("abc", "xyz"), 0.0, "{backend}");
        }
    }

    #[test]
    fn test_indel_ratio_values() {
        // LCS("abcd", "abed") = 3 → 6 / 8
        assert!((IndelRatio.ratio("abcd", "abed") - 75.0).abs() < 1e-9);
        // One empty side
        assert_eq!(IndelRatio.ratio("", "abc"), 0.0);
        assert_eq!(IndelRatio.ratio("", ""), 100.0);
    }

    #[test]
    fn test_lcs_len() {
        let a: Vec<char> = "moonlight".chars().collect();
        let b: Vec<char> = "mnlght".chars().collect();
        assert_eq!(lcs_len(&a, &b), 6);
    }

    #[test]
    fn test_partial_ratio_containment() {
        for backend in BACKENDS {
            let s = backend.similarity();
            let score = s.partial_ratio("moonlight legend full movie hd", "moonlight legend");
            assert_eq!(score, 100.0, "{backend}");
            // Argument order does not matter.
            let swapped = s.partial_ratio("moonlight legend", "moonlight legend full movie hd");
            assert_eq!(swapped, 100.0, "{backend}");
        }
    }

    #[test]
    fn test_partial_ratio_cjk() {
        let score = IndelRatio.partial_ratio("月光传说第1集完整版", "月光传说");
        assert_eq!(score, 100.0);
    }

    #[test]
    fn test_partial_ratio_empty() {
        assert_eq!(IndelRatio.partial_ratio("", "abc"), 0.0);
        assert_eq!(IndelRatio.partial_ratio("abc", ""), 0.0);
    }

    #[test]
    fn test_token_sort_ignores_order() {
        for backend in BACKENDS {
            let s = backend.similarity();
            assert_eq!(
                s.token_sort_ratio("season 2 drama name", "drama name season 2"),
                100.0,
                "{backend}"
            );
        }
    }

    #[test]
    fn test_best_is_max_of_three() {
        let s = IndelRatio;
        let (a, b) = ("drama season 2", "season 2 drama");
        let best = s.best(a, b);
        assert!(best >= s.ratio(a, b));
        assert!(best >= s.partial_ratio(a, b));
        assert_eq!(best, s.token_sort_ratio(a, b));
        assert_eq!(best, 100.0);
    }

    #[test]
    fn test_backend_config_names() {
        let b: SimilarityBackend = serde_json::from_str("\"levenshtein\"").unwrap();
        assert_eq!(b, SimilarityBackend::Levenshtein);
        assert_eq!(SimilarityBackend::default(), SimilarityBackend::Indel);
    }
}
