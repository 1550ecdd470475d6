//! Alias prioritization and search keyword expansion.
//!
//! For every catalog entry the collected aliases are ranked by how useful
//! they are as search terms, noisy ones are filtered out, and the survivors
//! are expanded into the ordered keyword list sent to the platform search.
//! The filtered alias list is kept alongside so candidates can later be
//! scored against the same names that were searched.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::{Alias, Catalog};
use crate::normalize::{char_len, is_ascii, normalize_for_match, normalize_text};

/// Episode markers appended to the anchor alias when requested.
pub const DEFAULT_EP_PATTERNS: &[&str] = &[
    "EP1",
    "E01",
    "E1",
    "Episode 1",
    "Ep 1",
    "第1集",
    "第1話",
    "第1话",
    "1화",
    "ตอนที่ 1",
    "Capítulo 1",
    "Episodio 1",
    "Épisode 1",
    "Folge 1",
    "Episódio 1",
];

/// Characters that mark a multi-part name.
const SEPARATORS: &[char] = &[' ', '\u{00B7}', '-', '\u{30FB}'];

/// Tunable alias ranking and noise-filter thresholds.
///
/// The defaults were chosen empirically against real search traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasHeuristics {
    pub canonical_bonus: f64,
    pub primary_bonus: f64,
    pub multi_token_bonus: f64,
    pub single_token_penalty: f64,
    pub very_short_len: usize,
    pub very_short_penalty: f64,
    pub short_len: usize,
    pub short_penalty: f64,
    pub moderate_len: usize,
    pub moderate_bonus: f64,
    pub medium_len: usize,
    pub medium_bonus: f64,
    pub long_len: usize,
    pub long_bonus: f64,
    pub separator_bonus: f64,
    /// Single ASCII tokens up to this many characters are dropped as noise.
    pub short_token_max_len: usize,
    /// Also drop short ASCII substrings of the canonical title.
    pub drop_canonical_substrings: bool,
    pub substring_min_compact_len: usize,
    pub substring_ratio_divisor: usize,
    pub substring_max_tokens: usize,
}

impl Default for AliasHeuristics {
    fn default() -> Self {
        Self {
            canonical_bonus: 200.0,
            primary_bonus: 120.0,
            multi_token_bonus: 40.0,
            single_token_penalty: 15.0,
            very_short_len: 4,
            very_short_penalty: 35.0,
            short_len: 6,
            short_penalty: 20.0,
            moderate_len: 8,
            moderate_bonus: 12.0,
            medium_len: 12,
            medium_bonus: 18.0,
            long_len: 20,
            long_bonus: 25.0,
            separator_bonus: 8.0,
            short_token_max_len: 6,
            drop_canonical_substrings: true,
            substring_min_compact_len: 10,
            substring_ratio_divisor: 2,
            substring_max_tokens: 3,
        }
    }
}

/// Keyword generation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub include_ep_patterns: bool,
    pub ep_patterns: Option<Vec<String>>,
    pub max_aliases: Option<usize>,
    pub min_alias_length: usize,
    pub heuristics: AliasHeuristics,
}

/// Options for [`expand_terms_for_series`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandOptions<'a> {
    pub include_ep_patterns: bool,
    /// Overrides [`DEFAULT_EP_PATTERNS`].
    pub ep_patterns: Option<&'a [String]>,
    /// Maximum number of distinct base aliases consumed.
    pub max_aliases: Option<usize>,
    /// Aliases shorter than this many characters are skipped.
    pub min_alias_length: usize,
}

impl KeywordConfig {
    fn expand_options(&self, include_ep_patterns: bool) -> ExpandOptions<'_> {
        ExpandOptions {
            include_ep_patterns,
            ep_patterns: self.ep_patterns.as_deref(),
            max_aliases: self.max_aliases,
            min_alias_length: self.min_alias_length,
        }
    }
}

// ── Priority ──────────────────────────────────────────────────────────

/// Score an alias by search usefulness. Higher is better.
///
/// `canonical_key` is the match key of the entry's canonical title (may be
/// empty when the entry has none).
pub fn alias_priority(
    name: &str,
    is_primary: bool,
    canonical_key: &str,
    h: &AliasHeuristics,
) -> f64 {
    let norm = normalize_text(name);
    if norm.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;
    if !canonical_key.is_empty() && normalize_for_match(&norm) == canonical_key {
        score += h.canonical_bonus;
    }
    if is_primary {
        score += h.primary_bonus;
    }

    match norm.split_whitespace().count() {
        0 => {}
        1 => score -= h.single_token_penalty,
        _ => score += h.multi_token_bonus,
    }

    let length = char_len(&norm);
    if length <= h.very_short_len {
        score -= h.very_short_penalty;
    } else if length <= h.short_len {
        score -= h.short_penalty;
    } else if length >= h.long_len {
        score += h.long_bonus;
    } else if length >= h.medium_len {
        score += h.medium_bonus;
    } else if length >= h.moderate_len {
        score += h.moderate_bonus;
    }

    if norm.contains(SEPARATORS) {
        score += h.separator_bonus;
    }

    score
}

/// Order aliases by priority, highest first; ties keep input order.
///
/// Aliases whose match key is empty are excluded.
pub fn order_aliases<'a>(
    aliases: &[&'a Alias],
    canonical_key: &str,
    h: &AliasHeuristics,
) -> Vec<&'a str> {
    let mut scored: Vec<(f64, usize, &str)> = aliases
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, a)| !normalize_for_match(&a.name).is_empty())
        .map(|(idx, a)| {
            (
                alias_priority(&a.name, a.is_primary, canonical_key, h),
                idx,
                a.name.as_str(),
            )
        })
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, _, name)| name).collect()
}

// ── Noise filter ──────────────────────────────────────────────────────

/// Drop aliases that make poor search terms, keeping priority order.
///
/// Never returns an empty list when `ordered` is non-empty: if everything
/// is filtered, the top-priority alias is kept.
pub fn filter_noise<'a>(
    ordered: &[&'a str],
    canonical_key: &str,
    h: &AliasHeuristics,
) -> Vec<&'a str> {
    let canonical_compact_len = compact_len(canonical_key);

    let filtered: Vec<&str> = ordered
        .iter()
        .copied()
        .filter(|name| {
            let key = normalize_for_match(name);
            if !canonical_key.is_empty() && key == canonical_key {
                return true;
            }

            // Shape is measured before punctuation erasure: "M.L." is one short token.
            let text = normalize_text(name);
            let tokens = text.split_whitespace().count();
            let key_compact_len = compact_len(&text);
            let ascii = is_ascii(&text);

            if ascii && tokens == 1 && key_compact_len <= h.short_token_max_len {
                return false;
            }

            let disproportionately_short = key_compact_len
                < h.substring_min_compact_len
                    .max(canonical_compact_len / h.substring_ratio_divisor.max(1));
            if h.drop_canonical_substrings
                && canonical_compact_len > 0
                && ascii
                && canonical_key.contains(key.as_str())
                && disproportionately_short
                && tokens <= h.substring_max_tokens
            {
                return false;
            }

            true
        })
        .collect();

    if filtered.is_empty() {
        ordered.iter().take(1).copied().collect()
    } else {
        filtered
    }
}

fn compact_len(s: &str) -> usize {
    s.chars().filter(|c| *c != ' ').count()
}

// ── Expansion ─────────────────────────────────────────────────────────

/// Turn an ordered alias list into the deduplicated search keyword list.
///
/// Base aliases are deduplicated by match key (first wins), filtered by
/// minimum length and capped at `max_aliases`. With episode markers
/// requested, `"{anchor} {marker}"` is appended for every marker, where the
/// anchor is the first surviving alias.
pub fn expand_terms_for_series<S: AsRef<str>>(
    aliases: &[S],
    options: &ExpandOptions<'_>,
) -> Vec<String> {
    // A zero cap would silence the entry entirely.
    let cap = options.max_aliases.map(|m| m.max(1));

    let mut seen_keys = HashSet::new();
    let mut base_terms: Vec<String> = Vec::new();

    for alias in aliases {
        let norm = normalize_text(alias.as_ref());
        if norm.is_empty() {
            continue;
        }
        if options.min_alias_length > 0 && char_len(&norm) < options.min_alias_length {
            continue;
        }
        let key = normalize_for_match(&norm);
        if key.is_empty() || !seen_keys.insert(key) {
            continue;
        }
        base_terms.push(norm);
        if cap.is_some_and(|c| base_terms.len() >= c) {
            break;
        }
    }

    let Some(anchor) = base_terms.first().cloned() else {
        return Vec::new();
    };

    let mut terms = base_terms;
    if options.include_ep_patterns {
        let markers: Vec<&str> = match options.ep_patterns {
            Some(custom) => custom.iter().map(String::as_str).collect(),
            None => DEFAULT_EP_PATTERNS.to_vec(),
        };
        for marker in markers {
            let combo = format!("{anchor} {marker}");
            let combo = combo.trim();
            if !combo.is_empty() {
                terms.push(combo.to_string());
            }
        }
    }

    let mut seen = HashSet::new();
    terms.retain(|t| seen.insert(t.clone()));
    terms
}

// ── Per-entry pipeline ────────────────────────────────────────────────

/// Keywords and scoring aliases for one catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTerms {
    pub series_id: String,
    /// Ordered keywords to submit to the platform search.
    pub search_terms: Vec<String>,
    /// Filtered aliases that candidates are scored against.
    pub alias_terms: Vec<String>,
}

/// Keyword lists for a whole catalog, in catalog alias order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordPlan {
    pub series: Vec<SeriesTerms>,
}

impl KeywordPlan {
    /// Series id → search keywords.
    pub fn keywords_by_series(&self) -> HashMap<&str, &[String]> {
        self.series
            .iter()
            .map(|s| (s.series_id.as_str(), s.search_terms.as_slice()))
            .collect()
    }

    /// Series id → filtered aliases used for scoring.
    pub fn aliases_by_series(&self) -> HashMap<&str, &[String]> {
        self.series
            .iter()
            .map(|s| (s.series_id.as_str(), s.alias_terms.as_slice()))
            .collect()
    }

    /// Keep only the given series ids. An empty filter keeps everything.
    pub fn retain_series(&mut self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        self.series.retain(|s| ids.iter().any(|id| *id == s.series_id));
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Compute keyword lists for one entry from its aliases.
pub fn build_terms_for_entry(
    series_id: &str,
    canonical_title: &str,
    aliases: &[&Alias],
    config: &KeywordConfig,
) -> SeriesTerms {
    let canonical_key = normalize_for_match(canonical_title);
    let ordered = order_aliases(aliases, &canonical_key, &config.heuristics);
    let filtered = filter_noise(&ordered, &canonical_key, &config.heuristics);

    let alias_terms = expand_terms_for_series(&filtered, &config.expand_options(false));
    let search_terms = if config.include_ep_patterns {
        expand_terms_for_series(&filtered, &config.expand_options(true))
    } else {
        alias_terms.clone()
    };

    SeriesTerms {
        series_id: series_id.to_string(),
        search_terms,
        alias_terms,
    }
}

/// Compute keyword lists for every catalog entry that has aliases.
#[tracing::instrument(name = "build_series_keywords", skip_all, fields(series = catalog.series.len()))]
pub fn build_series_keywords(catalog: &Catalog, config: &KeywordConfig) -> KeywordPlan {
    let titles = catalog.titles_by_series();
    let grouped = catalog.aliases_by_series();

    let series: Vec<SeriesTerms> = catalog
        .series_order()
        .into_iter()
        .map(|sid| {
            let canonical = titles.get(sid).copied().unwrap_or_default();
            let aliases = grouped.get(sid).map(Vec::as_slice).unwrap_or_default();
            build_terms_for_entry(sid, canonical, aliases, config)
        })
        .collect();

    let total_terms: usize = series.iter().map(|s| s.search_terms.len()).sum();
    tracing::debug!(entries = series.len(), total_terms, "Keyword plan built");

    KeywordPlan { series }
}
