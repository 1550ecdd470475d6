use std::path::PathBuf;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use copyguard_core::config::AppConfig;
use copyguard_core::report::{self, NewDetectionRow};

use crate::{DbHandle, RuntimeError};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportSummary {
    pub new_detections: usize,
    pub tracked: usize,
    pub taken_down: usize,
    pub deleted_removed: usize,
    pub new_detections_csv: PathBuf,
    pub tracking_csv: PathBuf,
}

/// Write the daily report sheets for `report_date`, then optionally purge
/// removed videos.
#[tracing::instrument(name = "report", skip_all, fields(date = %report_date))]
pub async fn run_report(
    db: &DbHandle,
    config: &AppConfig,
    report_date: NaiveDate,
) -> Result<ReportSummary, RuntimeError> {
    let new = db
        .videos_first_seen_on(report_date)
        .await
        .map_err(|e| RuntimeError::Database(e.to_string()))?;

    let from = report_date
        .checked_sub_days(Days::new(config.report.tracking_days.max(0) as u64))
        .unwrap_or(NaiveDate::MIN);
    let tracked = db
        .videos_in_window(from, report_date)
        .await
        .map_err(|e| RuntimeError::Database(e.to_string()))?;
    let tracking = report::tracking_rows(&tracked, report_date);

    let (new_path, tracking_path) = report::report_paths(&config.general.report_dir, report_date);
    let new_rows: Vec<NewDetectionRow<'_>> = new.iter().map(NewDetectionRow).collect();
    report::write_csv(&new_path, &new_rows).map_err(|e| RuntimeError::Report(e.to_string()))?;
    report::write_csv(&tracking_path, &tracking)
        .map_err(|e| RuntimeError::Report(e.to_string()))?;

    let mut summary = ReportSummary {
        new_detections: new.len(),
        tracked: tracking.len(),
        taken_down: tracking.iter().filter(|r| r.taken_down).count(),
        deleted_removed: 0,
        new_detections_csv: new_path,
        tracking_csv: tracking_path,
    };

    if config.report.delete_removed_after_report {
        summary.deleted_removed = db
            .delete_removed_videos()
            .await
            .map_err(|e| RuntimeError::Database(e.to_string()))?;
        if summary.deleted_removed > 0 {
            tracing::info!(deleted = summary.deleted_removed, "Removed videos purged");
        }
    }

    tracing::info!(
        new = summary.new_detections,
        tracked = summary.tracked,
        taken_down = summary.taken_down,
        "Report written"
    );
    Ok(summary)
}
