use std::path::Path;

use serde::Serialize;

use copyguard_core::report::read_ignore_list;

use crate::{DbHandle, RuntimeError};

#[derive(Debug, Clone, Default, Serialize)]
pub struct IgnoreSummary {
    /// Ids read from the list.
    pub loaded: usize,
    /// Stored videos that were flagged (0 on a dry run).
    pub updated: usize,
    pub dry_run: bool,
}

/// Flag every video named in an ignore-list CSV so it drops out of
/// rechecks and reports.
#[tracing::instrument(name = "ignore", skip(db), fields(path = %csv_path.display()))]
pub async fn apply_ignore_list(
    db: &DbHandle,
    csv_path: &Path,
    platform: &str,
    reason: &str,
    dry_run: bool,
) -> Result<IgnoreSummary, RuntimeError> {
    let mut ids = read_ignore_list(csv_path).map_err(|e| RuntimeError::Report(e.to_string()))?;
    ids.sort();
    ids.dedup();

    let mut summary = IgnoreSummary {
        loaded: ids.len(),
        updated: 0,
        dry_run,
    };
    if dry_run || ids.is_empty() {
        tracing::info!(loaded = summary.loaded, dry_run, "Ignore list read; nothing written");
        return Ok(summary);
    }

    summary.updated = db
        .set_ignore_reason(platform, ids, reason)
        .await
        .map_err(|e| RuntimeError::Database(e.to_string()))?;
    tracing::info!(loaded = summary.loaded, updated = summary.updated, "Ignore list applied");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use copyguard_core::models::VideoRecord;

    fn video(id: &str) -> VideoRecord {
        VideoRecord {
            platform: "dailymotion".into(),
            video_id: id.into(),
            url: None,
            title: "Moonlight Legend".into(),
            uploader: None,
            duration_sec: Some(3600),
            publish_time: None,
            views: None,
            raw_score: 1.5,
            score: 9.0,
            series_id: "s1".into(),
            series_name: "Moonlight Legend".into(),
            source_term: "Moonlight Legend".into(),
            first_seen: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            api_status: None,
            api_last_checked: None,
            ignore_reason: None,
            blocked_regions: Vec::new(),
        }
    }

    fn write_list(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("ignore.csv");
        std::fs::write(&path, "平台,视频ID,备注\ndailymotion,x1,官方\ndailymotion,x2,\ndailymotion,x1,重复\n").unwrap();
        path
    }

    #[tokio::test]
    async fn test_apply_ignore_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_list(dir.path());
        let db = DbHandle::open_memory().unwrap();
        db.insert_new_videos(vec![video("x1"), video("x3")]).await.unwrap();

        let summary = apply_ignore_list(&db, &path, "dailymotion", "official upload", false)
            .await
            .unwrap();
        assert_eq!(summary.loaded, 2);
        assert_eq!(summary.updated, 1);

        let day = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let visible = db.videos_first_seen_on(day).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].video_id, "x3");
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_list(dir.path());
        let db = DbHandle::open_memory().unwrap();
        db.insert_new_videos(vec![video("x1")]).await.unwrap();

        let summary = apply_ignore_list(&db, &path, "dailymotion", "official upload", true)
            .await
            .unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.updated, 0);
        let day = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert_eq!(db.videos_first_seen_on(day).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = DbHandle::open_memory().unwrap();
        let result =
            apply_ignore_list(&db, &dir.path().join("nope.csv"), "dailymotion", "x", false).await;
        assert!(result.is_err());
    }
}
