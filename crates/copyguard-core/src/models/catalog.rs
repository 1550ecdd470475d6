use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CopyguardError;

/// One protected title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable key derived from the canonical title's match key.
    pub series_id: String,
    pub canonical_title: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub exclusive: Option<bool>,
    #[serde(default)]
    pub doc_reference: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
}

/// Which import stage produced an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AliasSource {
    /// Owned-title sheet (title, online title, alias list).
    #[serde(rename = "sheet2")]
    TitleSheet,
    /// Multilingual title sheet joined on the English title.
    #[serde(rename = "sheet3")]
    MultilingualSheet,
    /// Per-language sheet joined on the original title.
    #[serde(rename = "sheet5")]
    BaseTitleSheet,
    #[serde(rename = "manual")]
    Manual,
}

impl AliasSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TitleSheet => "sheet2",
            Self::MultilingualSheet => "sheet3",
            Self::BaseTitleSheet => "sheet5",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for AliasSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alternate name for a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub series_id: String,
    pub name: String,
    #[serde(default)]
    pub lang: Option<String>,
    pub source: AliasSource,
    #[serde(default)]
    pub is_primary: bool,
}

/// A channel owned by the rights holder; never reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhitelistChannel {
    pub platform: String,
    pub channel_url: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogMeta {
    #[serde(default)]
    pub source_file: Option<String>,
}

/// The imported catalog as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub series: Vec<CatalogEntry>,
    #[serde(default)]
    pub aliases: Vec<Alias>,
    #[serde(default)]
    pub whitelist: Vec<WhitelistChannel>,
    #[serde(default)]
    pub meta: CatalogMeta,
}

impl Catalog {
    /// Read a catalog JSON file.
    pub fn load(path: &Path) -> Result<Self, CopyguardError> {
        let content = std::fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&content)?;
        Ok(catalog)
    }

    /// Write the catalog as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), CopyguardError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn entry(&self, series_id: &str) -> Option<&CatalogEntry> {
        self.series.iter().find(|s| s.series_id == series_id)
    }

    /// Aliases grouped per series, in import order.
    ///
    /// Aliases with an empty name or series id are skipped. The map keys
    /// follow first appearance in `aliases`; use [`Catalog::series_order`]
    /// for a deterministic iteration order.
    pub fn aliases_by_series(&self) -> HashMap<&str, Vec<&Alias>> {
        let mut grouped: HashMap<&str, Vec<&Alias>> = HashMap::new();
        for alias in &self.aliases {
            if alias.series_id.is_empty() || alias.name.is_empty() {
                continue;
            }
            grouped.entry(alias.series_id.as_str()).or_default().push(alias);
        }
        grouped
    }

    /// Series ids that own at least one alias, in order of first alias.
    pub fn series_order(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.aliases
            .iter()
            .filter(|a| !a.series_id.is_empty() && !a.name.is_empty())
            .filter_map(|a| seen.insert(a.series_id.as_str()).then_some(a.series_id.as_str()))
            .collect()
    }

    /// Canonical title per series id.
    pub fn titles_by_series(&self) -> HashMap<&str, &str> {
        self.series
            .iter()
            .filter(|s| !s.series_id.is_empty())
            .map(|s| (s.series_id.as_str(), s.canonical_title.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        Catalog {
            series: vec![CatalogEntry {
                series_id: "s1".into(),
                canonical_title: "Moonlight Legend".into(),
                content_type: Some("drama".into()),
                exclusive: Some(true),
                doc_reference: None,
                cover: None,
            }],
            aliases: vec![
                Alias {
                    series_id: "s1".into(),
                    name: "Moonlight Legend".into(),
                    lang: None,
                    source: AliasSource::TitleSheet,
                    is_primary: true,
                },
                Alias {
                    series_id: "s1".into(),
                    name: "月光传说".into(),
                    lang: Some("zh".into()),
                    source: AliasSource::BaseTitleSheet,
                    is_primary: false,
                },
                Alias {
                    series_id: "s2".into(),
                    name: "".into(),
                    lang: None,
                    source: AliasSource::Manual,
                    is_primary: false,
                },
            ],
            whitelist: vec![],
            meta: CatalogMeta::default(),
        }
    }

    #[test]
    fn test_aliases_by_series_skips_empty_names() {
        let catalog = sample();
        let grouped = catalog.aliases_by_series();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["s1"].len(), 2);
        assert_eq!(catalog.series_order(), vec!["s1"]);
    }

    #[test]
    fn test_source_tags_serialize_as_sheet_names() {
        let json = serde_json::to_string(&sample().aliases[0]).unwrap();
        assert!(json.contains("\"source\":\"sheet2\""));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("catalog.json");
        let catalog = sample();
        catalog.save(&path).unwrap();
        let loaded = Catalog::load(&path).unwrap();
        assert_eq!(loaded, catalog);
        assert_eq!(
            loaded.entry("s1").map(|e| e.canonical_title.as_str()),
            Some("Moonlight Legend")
        );
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"series":[{"series_id":"x","canonical_title":"X"}],
                       "aliases":[{"series_id":"x","name":"X","source":"sheet3"}]}"#;
        let catalog: Catalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.series[0].exclusive, None);
        assert!(!catalog.aliases[0].is_primary);
        assert!(catalog.whitelist.is_empty());
    }
}
