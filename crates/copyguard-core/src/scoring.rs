//! Relevance scoring of candidate video titles against a catalog entry.
//!
//! The raw score is a small non-negative number (typically 0–3). Rescaling
//! and thresholding are run-time policy applied by the caller.

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::normalize_for_match;
use crate::similarity::{Similarity, SimilarityBackend};

/// Generic re-upload / full-episode signals, each worth [`BOOST_PER_WORD`].
pub const BOOST_WORDS: &[&str] = &[
    "full",
    "完整版",
    "完整",
    "全集",
    "1080p",
    "720p",
    "hd",
    "ep",
    "episode",
    "第",
    "capítulo",
    "episodio",
    "épisode",
    "folge",
    "화",
    "話",
    "ตอน",
];

pub const BOOST_PER_WORD: f64 = 0.1;
pub const EXACT_MATCH_BONUS: f64 = 0.2;
/// Similarity credited when an alias is contained in the title.
pub const SUBSTRING_SIMILARITY: f64 = 98.0;

/// Similarity breakpoints and the base score each one awards, highest first.
const BREAKPOINTS: &[(f64, f64)] = &[(95.0, 1.5), (90.0, 1.2), (80.0, 0.8), (70.0, 0.4)];

/// A boost word and how to find it in a match-folded title.
struct BoostWord {
    word: String,
    /// Word-boundary pattern for ASCII alphanumeric words; `None` means
    /// plain substring containment (CJK, Thai, Hangul, accented words).
    boundary: Option<Regex>,
}

impl BoostWord {
    fn new(raw: &str) -> Self {
        let word = raw.to_lowercase();
        let ascii_alnum = word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ')
            && word.chars().any(|c| c != ' ');
        let boundary = if ascii_alnum {
            Regex::new(&format!(r"\b{}\b", regex::escape(&word))).ok()
        } else {
            None
        };
        Self { word, boundary }
    }

    fn found_in(&self, folded_title: &str) -> bool {
        if self.word.is_empty() {
            return false;
        }
        match &self.boundary {
            Some(re) => re.is_match(folded_title),
            None => folded_title.contains(self.word.as_str()),
        }
    }
}

static BOOSTS: LazyLock<Vec<BoostWord>> =
    LazyLock::new(|| BOOST_WORDS.iter().map(|w| BoostWord::new(w)).collect());

/// Best alias similarity for one title.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AliasMatch {
    /// Highest similarity over all aliases, 0–100.
    pub similarity: f64,
    /// Some alias folded to exactly the folded title.
    pub exact: bool,
}

/// Scores candidate titles with a chosen similarity backend.
#[derive(Clone, Copy)]
pub struct RelevanceScorer {
    similarity: &'static dyn Similarity,
}

impl std::fmt::Debug for RelevanceScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevanceScorer").finish_non_exhaustive()
    }
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(SimilarityBackend::default())
    }
}

impl RelevanceScorer {
    pub fn new(backend: SimilarityBackend) -> Self {
        Self {
            similarity: backend.similarity(),
        }
    }

    /// Find the best-matching alias for a title.
    pub fn best_match<I, S>(&self, title: &str, aliases: I) -> AliasMatch
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let folded_title = normalize_for_match(title);
        self.best_match_folded(&folded_title, aliases)
    }

    fn best_match_folded<I, S>(&self, folded_title: &str, aliases: I) -> AliasMatch
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut best: f64 = 0.0;
        let mut exact = false;

        for alias in aliases {
            let folded_alias = normalize_for_match(alias.as_ref());
            if folded_alias.is_empty() {
                continue;
            }
            if folded_alias == folded_title {
                exact = true;
                best = best.max(100.0);
                continue;
            }
            if folded_title.contains(folded_alias.as_str()) {
                best = best.max(SUBSTRING_SIMILARITY);
            }
            best = best.max(self.similarity.best(folded_title, &folded_alias));
        }

        AliasMatch {
            similarity: best,
            exact,
        }
    }

    /// Raw relevance score of `title` against an entry's aliases.
    pub fn score<I, S>(&self, title: &str, aliases: I) -> f64
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let folded_title = normalize_for_match(title);
        let matched = self.best_match_folded(&folded_title, aliases);

        let mut score = base_score(matched.similarity);
        if matched.exact {
            score += EXACT_MATCH_BONUS;
        }
        score + boost_score(&folded_title)
    }
}

/// Base score for a best similarity value.
pub fn base_score(similarity: f64) -> f64 {
    BREAKPOINTS
        .iter()
        .find(|(threshold, _)| similarity >= *threshold)
        .map(|(_, points)| *points)
        .unwrap_or(0.0)
}

/// Sum of boost-word contributions found in a match-folded title.
pub fn boost_score(folded_title: &str) -> f64 {
    BOOSTS
        .iter()
        .filter(|b| b.found_in(folded_title))
        .map(|_| BOOST_PER_WORD)
        .sum()
}

/// Raw relevance score using the default similarity backend.
pub fn compute_score<I, S>(title: &str, aliases: I) -> f64
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    RelevanceScorer::default().score(title, aliases)
}
