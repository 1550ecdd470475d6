use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::CopyguardError;
use crate::keywords::KeywordConfig;
use crate::similarity::SimilarityBackend;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Prefix of environment variables that override run-time knobs.
pub const ENV_PREFIX: &str = "COPYGUARD_";

/// Largest page the video platform serves.
pub const MAX_PAGE_SIZE: usize = 100;

/// Smallest usable score scale.
pub const MIN_SCORE_SCALE: f64 = 0.1;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub keywords: KeywordConfig,
    pub scoring: ScoringConfig,
    pub search: SearchConfig,
    pub recheck: RecheckConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Imported catalog JSON.
    pub data_path: PathBuf,
    pub report_dir: PathBuf,
    /// Defaults to the platform data directory.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Daily-rolling log files are written here when set.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub similarity_backend: SimilarityBackend,
    /// Multiplier from raw score to the 0–10 report scale.
    pub score_scale: f64,
    pub min_score: f64,
    pub min_duration_sec: u64,
}

impl ScoringConfig {
    pub fn effective_scale(&self) -> f64 {
        self.score_scale.max(MIN_SCORE_SCALE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub per_term_limit: usize,
    /// How many leading keywords per series count as primary terms.
    pub primary_aliases: usize,
    #[serde(default)]
    pub primary_per_term_limit: Option<usize>,
    pub sleep_ms: u64,
    /// Restrict detection to these series; empty means all.
    #[serde(default)]
    pub series_ids: Vec<String>,
    pub page_size: usize,
}

impl SearchConfig {
    pub fn primary_limit(&self) -> usize {
        self.primary_per_term_limit.unwrap_or(self.per_term_limit)
    }

    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecheckConfig {
    /// Videos younger than this are not rechecked yet.
    pub min_days: i64,
    /// Videos older than this are no longer rechecked.
    pub max_days: i64,
    pub sleep_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub tracking_days: i64,
    pub delete_removed_after_report: bool,
}

impl AppConfig {
    /// Load config: user file (if exists) merged over built-in defaults,
    /// then environment overrides.
    pub fn load() -> Result<Self, CopyguardError> {
        Self::load_from(&Self::config_path())
    }

    /// Like [`AppConfig::load`] with an explicit user file.
    pub fn load_from(user_path: &Path) -> Result<Self, CopyguardError> {
        let user = if user_path.exists() {
            Some(std::fs::read_to_string(user_path)?)
        } else {
            tracing::debug!(path = %user_path.display(), "No user config, using defaults");
            None
        };
        let mut config = Self::from_toml_layers(user.as_deref())?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse the built-in defaults with an optional user document on top.
    ///
    /// Tables merge key by key, so a user file only needs the keys it
    /// changes.
    pub fn from_toml_layers(user: Option<&str>) -> Result<Self, CopyguardError> {
        let mut merged: toml::Value =
            toml::from_str(DEFAULT_CONFIG).map_err(|e| CopyguardError::Config(e.to_string()))?;
        if let Some(user) = user {
            let overlay: toml::Value =
                toml::from_str(user).map_err(|e| CopyguardError::Config(e.to_string()))?;
            merge_toml(&mut merged, overlay);
        }
        merged
            .try_into()
            .map_err(|e: toml::de::Error| CopyguardError::Config(e.to_string()))
    }

    /// Apply `COPYGUARD_*` overrides. Unparseable values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        fn parsed<T: std::str::FromStr>(name: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            match raw.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(var = name, value = %raw, "Ignoring invalid override");
                    None
                }
            }
        }

        if let Some(v) = var("DB_PATH") {
            self.general.db_path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("LOG_DIR") {
            self.general.log_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = var("REPORT_DIR") {
            self.general.report_dir = PathBuf::from(v);
        }
        if let Some(v) = var("SIMILARITY_BACKEND") {
            match v.to_lowercase().as_str() {
                "indel" => self.scoring.similarity_backend = SimilarityBackend::Indel,
                "levenshtein" => self.scoring.similarity_backend = SimilarityBackend::Levenshtein,
                _ => tracing::warn!(value = %v, "Ignoring unknown similarity backend"),
            }
        }
        if let Some(v) = parsed::<f64>("SCORE_SCALE", var("SCORE_SCALE")) {
            self.scoring.score_scale = v.max(MIN_SCORE_SCALE);
        }
        if let Some(v) = parsed("MIN_SCORE", var("MIN_SCORE")) {
            self.scoring.min_score = v;
        }
        if let Some(v) = parsed("MIN_DURATION_SEC", var("MIN_DURATION_SEC")) {
            self.scoring.min_duration_sec = v;
        }
        if let Some(v) = parsed::<usize>("PER_TERM_LIMIT", var("PER_TERM_LIMIT")) {
            self.search.per_term_limit = v.max(1);
        }
        if let Some(v) = parsed("PRIMARY_ALIASES", var("PRIMARY_ALIASES")) {
            self.search.primary_aliases = v;
        }
        if let Some(v) = parsed::<usize>("PRIMARY_PER_TERM_LIMIT", var("PRIMARY_PER_TERM_LIMIT")) {
            self.search.primary_per_term_limit = Some(v.max(1));
        }
        if let Some(v) = parsed("SEARCH_SLEEP_MS", var("SEARCH_SLEEP_MS")) {
            self.search.sleep_ms = v;
        }
        if let Some(v) = var("SERIES_IDS") {
            self.search.series_ids = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = parsed("MAX_ALIASES", var("MAX_ALIASES")) {
            self.keywords.max_aliases = Some(v);
        }
        if let Some(v) = parsed("MIN_ALIAS_LENGTH", var("MIN_ALIAS_LENGTH")) {
            self.keywords.min_alias_length = v;
        }
        if let Some(v) = parsed::<i64>("RECHECK_MIN_DAYS", var("RECHECK_MIN_DAYS")) {
            self.recheck.min_days = v.max(0);
        }
        if let Some(v) = parsed::<i64>("RECHECK_MAX_DAYS", var("RECHECK_MAX_DAYS")) {
            self.recheck.max_days = v.max(0);
        }
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Path to the database file.
    pub fn db_path(&self) -> PathBuf {
        if let Some(path) = &self.general.db_path {
            return path.clone();
        }
        Self::project_dirs()
            .map(|d| d.data_dir().join("copyguard.db"))
            .unwrap_or_else(|| PathBuf::from("copyguard.db"))
    }

    /// Ensure the data directory exists and return the DB path.
    pub fn ensure_db_path(&self) -> Result<PathBuf, CopyguardError> {
        let path = self.db_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(path)
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "copyguard")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

/// Recursively overlay `overlay` onto `base`. Non-table values replace.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
