//! Catalog import: merges title rows from the rights holder's workbook into
//! a deduplicated [`Catalog`].
//!
//! The workbook has several sheets describing the same titles from
//! different angles. Rows arrive here already split into typed structs;
//! the builder joins them into entries and keeps a single alias index so
//! that no match key is ever recorded twice across the whole catalog.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::aliases::split_aliases;
use crate::error::CopyguardError;
use crate::models::{Alias, AliasSource, Catalog, CatalogEntry, CatalogMeta, WhitelistChannel};
use crate::normalize::{normalize_for_match, normalize_text};

/// Stable series id for a title: UUIDv5 of its match key.
pub fn series_id_for(name: &str) -> String {
    let key = format!("series:{}", normalize_for_match(name));
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
}

/// Interpret the exclusivity cell ("是", "yes", "true", …).
pub fn parse_exclusive(raw: &str) -> bool {
    matches!(
        normalize_text(raw).to_lowercase().as_str(),
        "是" | "yes" | "true" | "y" | "1"
    )
}

/// A row of the owned-title sheet.
#[derive(Debug, Clone, Default)]
pub struct TitleRow {
    pub title: String,
    /// Title as published; preferred over `title` as the canonical name.
    pub online_title: String,
    /// Delimiter-joined alias cell.
    pub aliases: String,
    pub content_type: String,
    pub exclusive: String,
    pub doc_reference: String,
    pub cover: String,
}

/// A row of a multilingual sheet: a join title plus `(lang, name)` pairs.
#[derive(Debug, Clone, Default)]
pub struct LocalizedRow {
    pub join_title: String,
    pub names: Vec<(String, String)>,
}

/// Incrementally builds a [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    series: Vec<CatalogEntry>,
    series_index: HashMap<String, usize>,
    aliases: Vec<Alias>,
    /// Match key → owning series id, across every sheet.
    alias_index: HashMap<String, String>,
    whitelist: Vec<WhitelistChannel>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row from the owned-title sheet.
    ///
    /// Returns the series id, or `None` when the row has no title.
    pub fn add_title_row(&mut self, row: &TitleRow) -> Option<String> {
        let online = normalize_text(&row.online_title);
        let title = normalize_text(&row.title);
        let canonical = if online.is_empty() { title.clone() } else { online.clone() };
        if canonical.is_empty() {
            return None;
        }

        let sid = series_id_for(&canonical);
        self.ensure_series(CatalogEntry {
            series_id: sid.clone(),
            canonical_title: canonical.clone(),
            content_type: non_empty(&row.content_type),
            exclusive: Some(parse_exclusive(&row.exclusive)),
            doc_reference: non_empty(&row.doc_reference),
            cover: non_empty(&row.cover),
        });
        let canonical = self.canonical_title(&sid).unwrap_or(canonical);

        let mut names = vec![title, online];
        names.extend(split_aliases(&row.aliases));
        for name in names {
            let is_primary = name == canonical;
            self.push_alias(&sid, &name, None, AliasSource::TitleSheet, is_primary);
        }
        Some(sid)
    }

    /// Add a row from the multilingual sheet, joined on the English title.
    pub fn add_multilingual_row(&mut self, row: &LocalizedRow) -> Option<String> {
        let join = normalize_text(&row.join_title);
        if join.is_empty() {
            return None;
        }
        let sid = self.resolve_or_create(&join);
        for (lang, name) in &row.names {
            self.push_alias(&sid, name, Some(lang), AliasSource::MultilingualSheet, false);
        }
        Some(sid)
    }

    /// Add a row from the per-language sheet, joined on the original title.
    ///
    /// Unlike the multilingual sheet, the join title is itself an alias.
    pub fn add_base_title_row(&mut self, row: &LocalizedRow) -> Option<String> {
        let base = normalize_text(&row.join_title);
        if base.is_empty() {
            return None;
        }
        let sid = self.resolve_or_create(&base);
        self.push_alias(&sid, &base, None, AliasSource::BaseTitleSheet, false);
        for (lang, name) in &row.names {
            self.push_alias(&sid, name, Some(lang), AliasSource::BaseTitleSheet, false);
        }
        Some(sid)
    }

    /// Record a rights-holder channel that must never be reported.
    pub fn add_whitelist_channel(
        &mut self,
        platform: &str,
        channel_url: &str,
        owner: &str,
        display_name: &str,
    ) {
        let url = normalize_text(channel_url);
        if url.is_empty() {
            return;
        }
        self.whitelist.push(WhitelistChannel {
            platform: platform.to_string(),
            channel_url: url,
            owner: non_empty(owner),
            display_name: non_empty(display_name),
        });
    }

    pub fn build(self, source_file: Option<String>) -> Catalog {
        tracing::info!(
            series = self.series.len(),
            aliases = self.aliases.len(),
            whitelist = self.whitelist.len(),
            "Catalog built"
        );
        Catalog {
            series: self.series,
            aliases: self.aliases,
            whitelist: self.whitelist,
            meta: CatalogMeta { source_file },
        }
    }

    /// Find the series an existing alias belongs to, else create one.
    fn resolve_or_create(&mut self, join_title: &str) -> String {
        if let Some(sid) = self.alias_index.get(&normalize_for_match(join_title)) {
            return sid.clone();
        }
        let sid = series_id_for(join_title);
        self.ensure_series(CatalogEntry {
            series_id: sid.clone(),
            canonical_title: join_title.to_string(),
            content_type: None,
            exclusive: None,
            doc_reference: None,
            cover: None,
        });
        sid
    }

    /// Insert the entry unless its id is already known (first import wins).
    fn ensure_series(&mut self, entry: CatalogEntry) {
        if self.series_index.contains_key(&entry.series_id) {
            return;
        }
        self.series_index
            .insert(entry.series_id.clone(), self.series.len());
        self.series.push(entry);
    }

    fn canonical_title(&self, sid: &str) -> Option<String> {
        self.series_index
            .get(sid)
            .map(|&i| self.series[i].canonical_title.clone())
    }

    /// Record an alias unless its match key is already taken.
    fn push_alias(
        &mut self,
        sid: &str,
        raw_name: &str,
        lang: Option<&str>,
        source: AliasSource,
        is_primary: bool,
    ) -> bool {
        let name = normalize_text(raw_name);
        if name.is_empty() {
            return false;
        }
        let key = normalize_for_match(&name);
        if key.is_empty() || self.alias_index.contains_key(&key) {
            return false;
        }
        self.alias_index.insert(key, sid.to_string());
        self.aliases.push(Alias {
            series_id: sid.to_string(),
            name,
            lang: lang.map(str::to_string),
            source,
            is_primary,
        });
        true
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let s = normalize_text(raw);
    (!s.is_empty()).then_some(s)
}

// ── Sheet exports ───────────────────────────────────────────────

/// Column headers of the owned-title sheet.
mod title_cols {
    pub const TITLE: &str = "剧名";
    pub const ONLINE_TITLE: &str = "上线剧名";
    pub const ALIASES: &str = "别名";
    pub const CONTENT_TYPE: &str = "作品类型";
    pub const EXCLUSIVE: &str = "是否独家";
    pub const DOC_REFERENCE: &str = "版本证明文件（脱敏版）";
    pub const COVER: &str = "封面";
}

/// Join column and language columns of the multilingual sheet.
const MULTILINGUAL_JOIN: &str = "English (英语)";
const MULTILINGUAL_LANGS: &[(&str, &str)] = &[
    ("English (英语)", "en"),
    ("Spanish (西班牙语)", "es"),
    ("Portuguese (葡萄牙语)", "pt"),
    ("Indonesian (印尼语)", "id"),
    ("French (法语)", "fr"),
    ("German (德语)", "de"),
    ("Italian (意大利语)", "it"),
    ("Korean (韩语)", "ko"),
    ("Japanese (日语)", "ja"),
    ("Thai (泰语)", "th"),
];

/// Join column and language columns of the per-language sheet.
const BASE_TITLE_JOIN: &str = "原剧名（英语或日语）";
const BASE_TITLE_LANGS: &[(&str, &str)] = &[
    ("西语", "es"),
    ("葡语", "pt"),
    ("意语", "it"),
    ("德语", "de"),
    ("法语", "fr"),
    ("日语", "ja"),
    ("韩语", "ko"),
    ("印尼语", "id"),
    ("泰语", "th"),
    ("繁中", "zh-Hant"),
];

mod whitelist_cols {
    pub const CHANNEL_URL: &str = "频道链接";
    pub const OWNER: &str = "所属人";
    pub const DISPLAY_NAME: &str = "头像+账户名";
}

/// CSV exports of the workbook sheets. Missing sheets are skipped.
#[derive(Debug, Clone, Default)]
pub struct SheetExports {
    pub titles: Option<PathBuf>,
    pub multilingual: Option<PathBuf>,
    pub base_titles: Option<PathBuf>,
    pub whitelist: Option<PathBuf>,
}

/// A sheet read into memory with a header lookup.
struct Sheet {
    headers: HashMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

impl Sheet {
    fn read(path: &Path) -> Result<Self, CopyguardError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)?;
        let headers = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| (normalize_text(h.trim_start_matches('\u{feff}')), i))
            .collect();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    /// Cell text for a named column; empty when the column or cell is missing.
    fn cell<'r>(&self, row: &'r csv::StringRecord, column: &str) -> &'r str {
        self.headers
            .get(column)
            .and_then(|&i| row.get(i))
            .unwrap_or("")
    }

    fn localized_row(&self, row: &csv::StringRecord, join: &str, langs: &[(&str, &str)]) -> LocalizedRow {
        LocalizedRow {
            join_title: self.cell(row, join).to_string(),
            names: langs
                .iter()
                .map(|(col, lang)| (lang.to_string(), self.cell(row, col).to_string()))
                .filter(|(_, name)| !name.trim().is_empty())
                .collect(),
        }
    }
}

/// Build a catalog from CSV exports of the rights holder's workbook.
///
/// Sheets are applied in a fixed order (titles, multilingual, base titles,
/// whitelist) so that join keys resolve against earlier sheets.
#[tracing::instrument(name = "catalog.import", skip(exports))]
pub fn import_sheet_exports(
    exports: &SheetExports,
    source_file: Option<String>,
) -> Result<Catalog, CopyguardError> {
    let mut builder = CatalogBuilder::new();

    if let Some(path) = &exports.titles {
        let sheet = Sheet::read(path)?;
        if sheet.rows.is_empty() {
            tracing::warn!(path = %path.display(), "Title sheet is empty");
        }
        for row in &sheet.rows {
            builder.add_title_row(&TitleRow {
                title: sheet.cell(row, title_cols::TITLE).to_string(),
                online_title: sheet.cell(row, title_cols::ONLINE_TITLE).to_string(),
                aliases: sheet.cell(row, title_cols::ALIASES).to_string(),
                content_type: sheet.cell(row, title_cols::CONTENT_TYPE).to_string(),
                exclusive: sheet.cell(row, title_cols::EXCLUSIVE).to_string(),
                doc_reference: sheet.cell(row, title_cols::DOC_REFERENCE).to_string(),
                cover: sheet.cell(row, title_cols::COVER).to_string(),
            });
        }
    }

    if let Some(path) = &exports.multilingual {
        let sheet = Sheet::read(path)?;
        for row in &sheet.rows {
            builder.add_multilingual_row(&sheet.localized_row(row, MULTILINGUAL_JOIN, MULTILINGUAL_LANGS));
        }
    }

    if let Some(path) = &exports.base_titles {
        let sheet = Sheet::read(path)?;
        for row in &sheet.rows {
            builder.add_base_title_row(&sheet.localized_row(row, BASE_TITLE_JOIN, BASE_TITLE_LANGS));
        }
    }

    if let Some(path) = &exports.whitelist {
        let sheet = Sheet::read(path)?;
        for row in &sheet.rows {
            builder.add_whitelist_channel(
                "youtube",
                sheet.cell(row, whitelist_cols::CHANNEL_URL),
                sheet.cell(row, whitelist_cols::OWNER),
                sheet.cell(row, whitelist_cols::DISPLAY_NAME),
            );
        }
    }

    Ok(builder.build(source_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moonlight_row() -> TitleRow {
        TitleRow {
            title: "月光传说".into(),
            online_title: "Moonlight Legend".into(),
            aliases: "ML，moonlight legend/Legend of the Moon".into(),
            content_type: "短剧".into(),
            exclusive: "是".into(),
            ..TitleRow::default()
        }
    }

    #[test]
    fn test_series_id_is_stable_across_spellings() {
        assert_eq!(series_id_for("Moonlight Legend"), series_id_for("  moonlight-LEGEND "));
        assert_ne!(series_id_for("Moonlight Legend"), series_id_for("Sunlight Legend"));
    }

    #[test]
    fn test_title_row_creates_entry_and_aliases() {
        let mut builder = CatalogBuilder::new();
        let sid = builder.add_title_row(&moonlight_row()).unwrap();
        let catalog = builder.build(Some("titles.xlsx".into()));

        assert_eq!(catalog.series.len(), 1);
        let entry = &catalog.series[0];
        assert_eq!(entry.series_id, sid);
        assert_eq!(entry.canonical_title, "Moonlight Legend");
        assert_eq!(entry.exclusive, Some(true));
        assert_eq!(entry.content_type.as_deref(), Some("短剧"));

        let names: Vec<&str> = catalog.aliases.iter().map(|a| a.name.as_str()).collect();
        // "moonlight legend" folds onto the online title and is dropped.
        assert_eq!(names, vec!["月光传说", "Moonlight Legend", "ML", "Legend of the Moon"]);
        let primary: Vec<&str> = catalog
            .aliases
            .iter()
            .filter(|a| a.is_primary)
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(primary, vec!["Moonlight Legend"]);
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let mut builder = CatalogBuilder::new();
        builder.add_title_row(&moonlight_row());
        builder.add_title_row(&moonlight_row());
        let catalog = builder.build(None);
        assert_eq!(catalog.series.len(), 1);
        assert_eq!(catalog.aliases.len(), 4);
    }

    #[test]
    fn test_multilingual_row_joins_existing_entry() {
        let mut builder = CatalogBuilder::new();
        let sid = builder.add_title_row(&moonlight_row()).unwrap();
        let joined = builder
            .add_multilingual_row(&LocalizedRow {
                join_title: "MOONLIGHT LEGEND".into(),
                names: vec![
                    ("es".into(), "La Leyenda de la Luz de Luna".into()),
                    ("ko".into(), "달빛 전설".into()),
                    ("en".into(), "Moonlight Legend".into()),
                ],
            })
            .unwrap();
        assert_eq!(joined, sid);

        let catalog = builder.build(None);
        assert_eq!(catalog.series.len(), 1);
        let korean = catalog.aliases.iter().find(|a| a.name == "달빛 전설").unwrap();
        assert_eq!(korean.lang.as_deref(), Some("ko"));
        assert_eq!(korean.source, AliasSource::MultilingualSheet);
        // The English name was already known.
        assert_eq!(catalog.aliases.len(), 6);
    }

    #[test]
    fn test_base_title_row_creates_entry_with_alias() {
        let mut builder = CatalogBuilder::new();
        let sid = builder
            .add_base_title_row(&LocalizedRow {
                join_title: "Sunset Vows".into(),
                names: vec![("ja".into(), "夕焼けの誓い".into())],
            })
            .unwrap();
        let catalog = builder.build(None);
        assert_eq!(catalog.series[0].series_id, sid);
        assert_eq!(catalog.series[0].canonical_title, "Sunset Vows");
        assert_eq!(catalog.series[0].exclusive, None);
        assert_eq!(catalog.aliases.len(), 2);
        assert!(catalog.aliases.iter().all(|a| a.source == AliasSource::BaseTitleSheet));
    }

    #[test]
    fn test_rows_without_titles_are_skipped() {
        let mut builder = CatalogBuilder::new();
        assert!(builder.add_title_row(&TitleRow::default()).is_none());
        assert!(builder.add_multilingual_row(&LocalizedRow::default()).is_none());
        builder.add_whitelist_channel("youtube", "  ", "", "");
        let catalog = builder.build(None);
        assert!(catalog.series.is_empty());
        assert!(catalog.whitelist.is_empty());
    }

    #[test]
    fn test_exclusive_parsing() {
        assert!(parse_exclusive("是"));
        assert!(parse_exclusive("Yes"));
        assert!(parse_exclusive("TRUE"));
        assert!(!parse_exclusive("否"));
        assert!(!parse_exclusive(""));
    }

    #[test]
    fn test_import_sheet_exports() {
        let dir = tempfile::tempdir().unwrap();
        let titles = dir.path().join("titles.csv");
        std::fs::write(
            &titles,
            "剧名,上线剧名,别名,作品类型,是否独家\n\
             月光传说,Moonlight Legend,ML；Legend of the Moon,短剧,是\n\
             ,,,,\n",
        )
        .unwrap();
        let multilingual = dir.path().join("multilingual.csv");
        std::fs::write(
            &multilingual,
            "English (英语),Korean (韩语),Thai (泰语)\n\
             Moonlight Legend,달빛 전설,\n",
        )
        .unwrap();
        let whitelist = dir.path().join("whitelist.csv");
        std::fs::write(
            &whitelist,
            "频道链接,所属人,头像+账户名\nhttps://youtube.com/@studio,ops,Studio\n",
        )
        .unwrap();

        let exports = SheetExports {
            titles: Some(titles),
            multilingual: Some(multilingual),
            base_titles: None,
            whitelist: Some(whitelist),
        };
        let catalog = import_sheet_exports(&exports, Some("titles.xlsx".into())).unwrap();

        assert_eq!(catalog.series.len(), 1);
        assert_eq!(catalog.series[0].canonical_title, "Moonlight Legend");
        assert!(catalog.aliases.iter().any(|a| a.name == "달빛 전설"));
        assert_eq!(catalog.whitelist.len(), 1);
        assert_eq!(catalog.whitelist[0].owner.as_deref(), Some("ops"));
        assert_eq!(catalog.meta.source_file.as_deref(), Some("titles.xlsx"));
    }
}
