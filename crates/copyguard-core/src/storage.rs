use std::collections::HashSet;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use rusqlite::{params, params_from_iter, Connection};

use crate::error::CopyguardError;
use crate::models::{ApiStatus, VideoRecord};

const SCHEMA_V1: &str = include_str!("../../../migrations/001_initial.sql");
const SCHEMA_V2: &str = include_str!("../../../migrations/002_ignore_and_regions.sql");

/// Ids per `IN (...)` lookup, below SQLite's bound-parameter limit.
const LOOKUP_BATCH: usize = 500;

const VIDEO_COLUMNS: &str = "platform, video_id, url, title, uploader, duration_sec,
     publish_time, views, raw_score, score, series_id, series_name, source_term,
     first_seen, api_status, api_last_checked, ignore_reason, blocked_regions";

/// SQLite-backed store of detected videos.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, CopyguardError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, CopyguardError> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    // ── Detection ───────────────────────────────────────────────

    /// Which of `video_ids` are already stored for `platform`.
    pub fn existing_video_ids(
        &self,
        platform: &str,
        video_ids: &[String],
    ) -> Result<HashSet<String>, CopyguardError> {
        let mut found = HashSet::new();
        for chunk in video_ids.chunks(LOOKUP_BATCH) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT video_id FROM videos WHERE platform = ? AND video_id IN ({placeholders})"
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let values = std::iter::once(platform).chain(chunk.iter().map(String::as_str));
            let rows = stmt.query_map(params_from_iter(values), |row| row.get::<_, String>(0))?;
            for id in rows {
                found.insert(id?);
            }
        }
        Ok(found)
    }

    /// Insert videos not yet stored. Existing rows (and their `first_seen`)
    /// are left untouched. Returns how many rows were inserted.
    pub fn insert_new_videos(&self, videos: &[VideoRecord]) -> Result<usize, CopyguardError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO videos ({VIDEO_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                         ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
            ))?;
            for v in videos {
                let regions = serde_json::to_string(&v.blocked_regions)?;
                inserted += stmt.execute(params![
                    v.platform,
                    v.video_id,
                    v.url,
                    v.title,
                    v.uploader,
                    v.duration_sec.map(|d| d as i64),
                    v.publish_time,
                    v.views.map(|n| n as i64),
                    v.raw_score,
                    v.score,
                    v.series_id,
                    v.series_name,
                    v.source_term,
                    v.first_seen.to_string(),
                    v.api_status.map(|s| s.as_db_str()),
                    v.api_last_checked.map(|d| d.to_string()),
                    v.ignore_reason,
                    regions,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    // ── Recheck ─────────────────────────────────────────────────

    /// Videos first seen between `max_days` and `min_days` before `today`
    /// (inclusive) whose status is active or never checked. Ignored videos
    /// are excluded.
    pub fn videos_to_recheck(
        &self,
        min_days: i64,
        max_days: i64,
        today: NaiveDate,
    ) -> Result<Vec<VideoRecord>, CopyguardError> {
        let newest = today - Duration::days(min_days);
        let oldest = today - Duration::days(max_days);
        self.query_videos(
            "WHERE first_seen >= ?1 AND first_seen <= ?2
               AND (api_status IS NULL OR api_status = 'active')
               AND ignore_reason IS NULL
             ORDER BY first_seen, video_id",
            params![oldest.to_string(), newest.to_string()],
        )
    }

    /// Record the outcome of a status lookup. Returns false when the video
    /// is not stored.
    pub fn update_video_status(
        &self,
        platform: &str,
        video_id: &str,
        status: ApiStatus,
        checked: NaiveDate,
        blocked_regions: &[String],
    ) -> Result<bool, CopyguardError> {
        let regions = serde_json::to_string(blocked_regions)?;
        let changed = self.conn.execute(
            "UPDATE videos SET api_status = ?1, api_last_checked = ?2, blocked_regions = ?3
             WHERE platform = ?4 AND video_id = ?5",
            params![status.as_db_str(), checked.to_string(), regions, platform, video_id],
        )?;
        Ok(changed > 0)
    }

    /// Drop every video whose last known status is removed.
    pub fn delete_removed_videos(&self) -> Result<usize, CopyguardError> {
        let deleted = self.conn.execute(
            "DELETE FROM videos WHERE api_status = ?1",
            params![ApiStatus::Removed.as_db_str()],
        )?;
        Ok(deleted)
    }

    // ── Reports ─────────────────────────────────────────────────

    /// Videos first detected on `date`, best score first.
    pub fn videos_first_seen_on(&self, date: NaiveDate) -> Result<Vec<VideoRecord>, CopyguardError> {
        self.query_videos(
            "WHERE first_seen = ?1 AND ignore_reason IS NULL ORDER BY score DESC, video_id",
            params![date.to_string()],
        )
    }

    /// Videos first detected in `[from, before)`.
    pub fn videos_in_window(
        &self,
        from: NaiveDate,
        before: NaiveDate,
    ) -> Result<Vec<VideoRecord>, CopyguardError> {
        self.query_videos(
            "WHERE first_seen >= ?1 AND first_seen < ?2 AND ignore_reason IS NULL
             ORDER BY first_seen, video_id",
            params![from.to_string(), before.to_string()],
        )
    }

    // ── Maintenance ─────────────────────────────────────────────

    /// Flag videos so they drop out of rechecks and reports.
    pub fn set_ignore_reason(
        &self,
        platform: &str,
        video_ids: &[String],
        reason: &str,
    ) -> Result<usize, CopyguardError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE videos SET ignore_reason = ?1 WHERE platform = ?2 AND video_id = ?3",
            )?;
            for id in video_ids {
                updated += stmt.execute(params![reason, platform, id])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    pub fn count_videos(&self) -> Result<usize, CopyguardError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_videos(
        &self,
        clause: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<VideoRecord>, CopyguardError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {VIDEO_COLUMNS} FROM videos {clause}"))?;
        let rows = stmt
            .query_map(params, |row| Ok(row_to_video(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

fn run_migrations(conn: &Connection) -> Result<(), CopyguardError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    if version < 2 {
        conn.execute_batch(SCHEMA_V2)?;
        conn.pragma_update(None, "user_version", 2)?;
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn row_to_video(row: &rusqlite::Row<'_>) -> VideoRecord {
    let first_seen: String = row.get(13).unwrap_or_default();
    let status: Option<String> = row.get(14).unwrap_or(None);
    let checked: Option<String> = row.get(15).unwrap_or(None);
    let regions: String = row.get(17).unwrap_or_default();

    VideoRecord {
        platform: row.get(0).unwrap_or_default(),
        video_id: row.get(1).unwrap_or_default(),
        url: row.get(2).unwrap_or(None),
        title: row.get(3).unwrap_or_default(),
        uploader: row.get(4).unwrap_or(None),
        duration_sec: row
            .get::<_, Option<i64>>(5)
            .unwrap_or(None)
            .map(|v| v.max(0) as u64),
        publish_time: row.get(6).unwrap_or(None),
        views: row
            .get::<_, Option<i64>>(7)
            .unwrap_or(None)
            .map(|v| v.max(0) as u64),
        raw_score: row.get(8).unwrap_or(0.0),
        score: row.get(9).unwrap_or(0.0),
        series_id: row.get(10).unwrap_or_default(),
        series_name: row.get(11).unwrap_or_default(),
        source_term: row.get(12).unwrap_or_default(),
        first_seen: parse_date(&first_seen).unwrap_or_default(),
        api_status: status.as_deref().and_then(ApiStatus::from_db_str),
        api_last_checked: checked.as_deref().and_then(parse_date),
        ignore_reason: row.get(16).unwrap_or(None),
        blocked_regions: serde_json::from_str(&regions).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn get_video(db: &Storage, platform: &str, video_id: &str) -> Option<VideoRecord> {
        db.query_videos(
            "WHERE platform = ?1 AND video_id = ?2",
            params![platform, video_id],
        )
        .unwrap()
        .pop()
    }

    fn video(id: &str, first_seen: &str) -> VideoRecord {
        VideoRecord {
            platform: "dailymotion".into(),
            video_id: id.into(),
            url: Some(format!("https://www.dailymotion.com/video/{id}")),
            title: "Moonlight Legend Full Movie".into(),
            uploader: Some("uploader".into()),
            duration_sec: Some(3600),
            publish_time: Some(1_700_000_000),
            views: Some(42),
            raw_score: 1.6,
            score: 9.6,
            series_id: "s1".into(),
            series_name: "Moonlight Legend".into(),
            source_term: "Moonlight Legend".into(),
            first_seen: day(first_seen),
            api_status: None,
            api_last_checked: None,
            ignore_reason: None,
            blocked_regions: vec![],
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = Storage::open_memory().unwrap();
        let inserted = db.insert_new_videos(&[video("x1", "2025-01-10")]).unwrap();
        assert_eq!(inserted, 1);
        let stored = get_video(&db, "dailymotion", "x1").unwrap();
        assert_eq!(stored, video("x1", "2025-01-10"));
        assert_eq!(db.count_videos().unwrap(), 1);
    }

    #[test]
    fn test_insert_never_overwrites_first_seen() {
        let db = Storage::open_memory().unwrap();
        db.insert_new_videos(&[video("x1", "2025-01-10")]).unwrap();
        let inserted = db.insert_new_videos(&[video("x1", "2025-02-01")]).unwrap();
        assert_eq!(inserted, 0);
        let stored = get_video(&db, "dailymotion", "x1").unwrap();
        assert_eq!(stored.first_seen, day("2025-01-10"));
    }

    #[test]
    fn test_existing_ids_across_batches() {
        let db = Storage::open_memory().unwrap();
        let videos: Vec<VideoRecord> = (0..(LOOKUP_BATCH + 20))
            .step_by(2)
            .map(|i| video(&format!("v{i}"), "2025-01-10"))
            .collect();
        db.insert_new_videos(&videos).unwrap();

        let ids: Vec<String> = (0..(LOOKUP_BATCH + 20)).map(|i| format!("v{i}")).collect();
        let found = db.existing_video_ids("dailymotion", &ids).unwrap();
        assert_eq!(found.len(), videos.len());
        assert!(found.contains("v0"));
        assert!(!found.contains("v1"));
        assert!(db.existing_video_ids("youtube", &ids).unwrap().is_empty());
        assert!(db.existing_video_ids("dailymotion", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_recheck_window_and_status() {
        let db = Storage::open_memory().unwrap();
        let today = day("2025-03-31");
        db.insert_new_videos(&[
            video("too_new", "2025-03-30"),
            video("edge_new", "2025-03-29"),
            video("middle", "2025-03-15"),
            video("edge_old", "2025-03-01"),
            video("too_old", "2025-02-28"),
            video("private", "2025-03-15"),
        ])
        .unwrap();
        db.update_video_status("dailymotion", "private", ApiStatus::Private, today, &[])
            .unwrap();

        let ids: Vec<String> = db
            .videos_to_recheck(2, 30, today)
            .unwrap()
            .into_iter()
            .map(|v| v.video_id)
            .collect();
        assert_eq!(ids, vec!["edge_old", "middle", "edge_new"]);
    }

    #[test]
    fn test_update_status_records_regions() {
        let db = Storage::open_memory().unwrap();
        db.insert_new_videos(&[video("x1", "2025-01-10")]).unwrap();
        let regions = vec!["FR".to_string(), "DE".to_string()];
        assert!(db
            .update_video_status("dailymotion", "x1", ApiStatus::Active, day("2025-01-12"), &regions)
            .unwrap());
        assert!(!db
            .update_video_status("dailymotion", "missing", ApiStatus::Active, day("2025-01-12"), &[])
            .unwrap());

        let stored = get_video(&db, "dailymotion", "x1").unwrap();
        assert_eq!(stored.api_status, Some(ApiStatus::Active));
        assert_eq!(stored.api_last_checked, Some(day("2025-01-12")));
        assert_eq!(stored.blocked_regions, regions);
    }

    #[test]
    fn test_delete_removed() {
        let db = Storage::open_memory().unwrap();
        db.insert_new_videos(&[video("a", "2025-01-10"), video("b", "2025-01-10")])
            .unwrap();
        db.update_video_status("dailymotion", "a", ApiStatus::Removed, day("2025-01-12"), &[])
            .unwrap();
        assert_eq!(db.delete_removed_videos().unwrap(), 1);
        assert_eq!(db.count_videos().unwrap(), 1);
        assert!(get_video(&db, "dailymotion", "a").is_none());
    }

    #[test]
    fn test_report_queries() {
        let db = Storage::open_memory().unwrap();
        let mut low = video("low", "2025-01-10");
        low.score = 6.0;
        db.insert_new_videos(&[
            low,
            video("high", "2025-01-10"),
            video("older", "2025-01-01"),
            video("ancient", "2024-11-01"),
        ])
        .unwrap();

        let today: Vec<String> = db
            .videos_first_seen_on(day("2025-01-10"))
            .unwrap()
            .into_iter()
            .map(|v| v.video_id)
            .collect();
        assert_eq!(today, vec!["high", "low"]);

        let window = db
            .videos_in_window(day("2024-12-11"), day("2025-01-10"))
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].video_id, "older");
    }

    #[test]
    fn test_ignore_reason_excludes_from_queries() {
        let db = Storage::open_memory().unwrap();
        db.insert_new_videos(&[video("a", "2025-03-15"), video("b", "2025-03-15")])
            .unwrap();
        let updated = db
            .set_ignore_reason("dailymotion", &["a".into(), "nope".into()], "manual_ignore")
            .unwrap();
        assert_eq!(updated, 1);

        let recheck = db.videos_to_recheck(2, 30, day("2025-03-31")).unwrap();
        assert_eq!(recheck.len(), 1);
        assert_eq!(recheck[0].video_id, "b");
        assert_eq!(db.videos_first_seen_on(day("2025-03-15")).unwrap().len(), 1);
        assert_eq!(
            get_video(&db, "dailymotion", "a").unwrap().ignore_reason.as_deref(),
            Some("manual_ignore")
        );
    }

    #[test]
    fn test_file_database_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copyguard.db");
        {
            let db = Storage::open(&path).unwrap();
            db.insert_new_videos(&[video("x1", "2025-01-10")]).unwrap();
        }
        let db = Storage::open(&path).unwrap();
        assert_eq!(db.count_videos().unwrap(), 1);
    }
}
