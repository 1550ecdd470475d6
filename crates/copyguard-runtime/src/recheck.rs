//! Status recheck: poll the platform for tracked videos and write the
//! status-update sheet.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use copyguard_api::traits::VideoPlatform;
use copyguard_core::config::AppConfig;
use copyguard_core::models::ApiStatus;
use copyguard_core::recheck::{classify_status, status_rows};
use copyguard_core::report;

use crate::{DbHandle, RuntimeError};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecheckSummary {
    pub checked: usize,
    pub active: usize,
    pub taken_down: usize,
    /// Videos whose lookup failed; their stored status is left unchanged.
    pub failed: Vec<String>,
    pub sheet_rows: usize,
    /// Sheet rows whose video is still online or unchecked.
    pub pending: usize,
    pub status_csv: Option<PathBuf>,
}

#[tracing::instrument(name = "recheck", skip_all, fields(platform = platform.name(), today = %today))]
pub async fn run_recheck<P: VideoPlatform>(
    platform: &P,
    db: &DbHandle,
    config: &AppConfig,
    today: NaiveDate,
) -> Result<RecheckSummary, RuntimeError> {
    let window = &config.recheck;
    let mut summary = RecheckSummary::default();

    let due = db
        .videos_to_recheck(window.min_days, window.max_days, today)
        .await
        .map_err(|e| RuntimeError::Database(e.to_string()))?;
    let due: Vec<_> = due
        .into_iter()
        .filter(|v| v.platform == platform.name())
        .collect();
    tracing::info!(
        due = due.len(),
        min_days = window.min_days,
        max_days = window.max_days,
        "Rechecking tracked videos"
    );

    let sleep = Duration::from_millis(window.sleep_ms);
    for video in &due {
        let status = match platform.video_status(&video.video_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(video_id = %video.video_id, error = %e, "Status lookup failed");
                summary.failed.push(video.video_id.clone());
                continue;
            }
        };

        let api_status = classify_status(
            status.exists,
            status.private,
            status.password_protected,
            status.status.as_deref(),
        );
        db.update_video_status(
            &video.platform,
            &video.video_id,
            api_status,
            today,
            status.geoblocking.blocked,
        )
        .await
        .map_err(|e| RuntimeError::Database(e.to_string()))?;

        summary.checked += 1;
        if api_status == ApiStatus::Active {
            summary.active += 1;
        } else {
            tracing::debug!(video_id = %video.video_id, status = %api_status, "Taken down");
            summary.taken_down += 1;
        }
        tokio::time::sleep(sleep).await;
    }

    // The sheet covers everything still tracked in the window, checked or not.
    let from = today
        .checked_sub_days(Days::new(window.max_days.max(0) as u64))
        .unwrap_or(NaiveDate::MIN);
    let before = today.succ_opt().unwrap_or(NaiveDate::MAX);
    let tracked = db
        .videos_in_window(from, before)
        .await
        .map_err(|e| RuntimeError::Database(e.to_string()))?;
    let rows = status_rows(&tracked, today);
    summary.pending = rows.iter().filter(|r| !r.action.is_resolved()).count();

    let path = report::status_update_path(&config.general.report_dir, today);
    summary.sheet_rows =
        report::write_csv(&path, &rows).map_err(|e| RuntimeError::Report(e.to_string()))?;
    summary.status_csv = Some(path);

    tracing::info!(
        checked = summary.checked,
        taken_down = summary.taken_down,
        failed = summary.failed.len(),
        pending = summary.pending,
        "Recheck finished"
    );
    Ok(summary)
}
