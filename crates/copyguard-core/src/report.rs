//! CSV report sheets and the ignore-list reader.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::CopyguardError;
use crate::models::VideoRecord;
use crate::recheck::StatusRow;

/// Header names that identify the video-id column of an ignore list.
const VIDEO_ID_HEADERS: &[&str] = &["视频ID", "视频id", "video_id"];

/// A record type written as one CSV sheet.
pub trait CsvRow {
    fn header() -> &'static [&'static str];
    fn record(&self) -> Vec<String>;
}

/// Write `rows` with a header line, creating parent directories.
/// Returns the number of data rows written.
pub fn write_csv<R: CsvRow>(path: &Path, rows: &[R]) -> Result<usize, CopyguardError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(R::header())?;
    for row in rows {
        writer.write_record(row.record())?;
    }
    writer.flush()?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "Wrote CSV");
    Ok(rows.len())
}

fn opt(s: &Option<String>) -> String {
    s.clone().unwrap_or_default()
}

fn opt_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.to_string()).unwrap_or_default()
}

// ── File names ──────────────────────────────────────────────────

pub fn candidates_path(dir: &Path, platform: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{platform}_candidates_{date}.csv"))
}

pub fn new_detections_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("new_detections_{date}.csv"))
}

pub fn status_update_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("status_update_{date}.csv"))
}

/// Paths of the two report sheets: new detections and tracking.
pub fn report_paths(dir: &Path, date: NaiveDate) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("piracy_report_{date}_new_detections.csv")),
        dir.join(format!("piracy_report_{date}_tracking.csv")),
    )
}

// ── Detection sheet ─────────────────────────────────────────────

/// Whether a passing candidate was stored for the first time this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStatus {
    New,
    Existing,
}

impl DetectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Existing => "existing",
        }
    }
}

/// One scored candidate that passed the filters.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRow {
    pub platform: String,
    pub video_id: String,
    pub title: String,
    pub url: Option<String>,
    pub uploader: Option<String>,
    pub duration_sec: u64,
    pub score: f64,
    pub status: DetectionStatus,
}

impl CsvRow for DetectionRow {
    fn header() -> &'static [&'static str] {
        &["platform", "video_id", "title", "url", "uploader", "duration_sec", "score", "status"]
    }

    fn record(&self) -> Vec<String> {
        vec![
            self.platform.clone(),
            self.video_id.clone(),
            self.title.clone(),
            opt(&self.url),
            opt(&self.uploader),
            self.duration_sec.to_string(),
            format!("{:.1}", self.score),
            self.status.as_str().to_string(),
        ]
    }
}

/// Order detection rows best score first (stable for ties).
pub fn sort_by_score(rows: &mut [DetectionRow]) {
    rows.sort_by(|a, b| b.score.total_cmp(&a.score));
}

// ── Status sheet ────────────────────────────────────────────────

impl CsvRow for StatusRow {
    fn header() -> &'static [&'static str] {
        &[
            "platform",
            "video_id",
            "title",
            "url",
            "uploader",
            "first_seen",
            "days_tracked",
            "api_status",
            "last_checked",
            "action_needed",
        ]
    }

    fn record(&self) -> Vec<String> {
        vec![
            self.platform.clone(),
            self.video_id.clone(),
            self.title.clone(),
            opt(&self.url),
            opt(&self.uploader),
            self.first_seen.to_string(),
            self.days_tracked.to_string(),
            self.api_status
                .map(|s| s.as_db_str().to_string())
                .unwrap_or_else(|| "unknown".into()),
            opt_date(self.last_checked),
            self.action.label().to_string(),
        ]
    }
}

// ── Report sheets ───────────────────────────────────────────────

/// Row of the new-detections report sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDetectionRow<'a>(pub &'a VideoRecord);

impl CsvRow for NewDetectionRow<'_> {
    fn header() -> &'static [&'static str] {
        &["平台", "视频ID", "标题", "URL", "上传者", "时长(秒)", "分数", "检测时间", "剧集ID"]
    }

    fn record(&self) -> Vec<String> {
        let v = self.0;
        vec![
            v.platform.clone(),
            v.video_id.clone(),
            v.title.clone(),
            opt(&v.url),
            opt(&v.uploader),
            v.duration_sec.map(|d| d.to_string()).unwrap_or_default(),
            format!("{:.1}", v.score),
            v.first_seen.to_string(),
            v.series_id.clone(),
        ]
    }
}

/// Row of the tracking report sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingRow<'a> {
    pub video: &'a VideoRecord,
    pub days_tracked: i64,
    pub taken_down: bool,
}

impl<'a> TrackingRow<'a> {
    pub fn new(video: &'a VideoRecord, report_date: NaiveDate) -> Self {
        Self {
            video,
            days_tracked: video.days_tracked(report_date),
            taken_down: video.api_status.is_some_and(|s| s.is_taken_down()),
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.taken_down {
            "已下架 ✓"
        } else {
            "未下架"
        }
    }
}

impl CsvRow for TrackingRow<'_> {
    fn header() -> &'static [&'static str] {
        &["平台", "视频ID", "标题", "URL", "上传者", "首次检测", "追踪天数", "当前状态", "上次检查", "剧集ID"]
    }

    fn record(&self) -> Vec<String> {
        let v = self.video;
        vec![
            v.platform.clone(),
            v.video_id.clone(),
            v.title.clone(),
            opt(&v.url),
            opt(&v.uploader),
            v.first_seen.to_string(),
            self.days_tracked.to_string(),
            self.status_label().to_string(),
            opt_date(v.api_last_checked),
            v.series_id.clone(),
        ]
    }
}

/// Tracking sheet rows: still-online videos first, then longest tracked.
pub fn tracking_rows(videos: &[VideoRecord], report_date: NaiveDate) -> Vec<TrackingRow<'_>> {
    let mut rows: Vec<TrackingRow<'_>> = videos
        .iter()
        .map(|v| TrackingRow::new(v, report_date))
        .collect();
    rows.sort_by_key(|r| (r.taken_down, Reverse(r.days_tracked)));
    rows
}

// ── Ignore lists ────────────────────────────────────────────────

/// Read video ids from an ignore-list CSV.
///
/// The id column is the one headed `视频ID` / `video_id`; without such a
/// header the second column is used (the first if there is only one). A
/// blank header line is treated as data.
pub fn read_ignore_list(path: &Path) -> Result<Vec<String>, CopyguardError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut records = reader.records();

    let Some(first) = records.next().transpose()? else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = first
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let column = header
        .iter()
        .position(|h| VIDEO_ID_HEADERS.contains(&h.as_str()))
        .unwrap_or(if header.len() > 1 { 1 } else { 0 });

    let mut ids = Vec::new();
    if header.iter().all(|h| h.is_empty()) {
        push_id(&mut ids, &first, column);
    }
    for record in records {
        push_id(&mut ids, &record?, column);
    }
    Ok(ids)
}

fn push_id(ids: &mut Vec<String>, record: &csv::StringRecord, column: usize) {
    if let Some(id) = record.get(column).map(str::trim).filter(|s| !s.is_empty()) {
        ids.push(id.to_string());
    }
}
