//! Takedown status classification and follow-up hints.

use std::cmp::Reverse;

use chrono::NaiveDate;

use crate::models::{ApiStatus, VideoRecord};

/// Platform moderation state that means the upload was refused.
const REJECTED_STATE: &str = "rejected";

/// Active uploads tracked at least this long need escalation.
pub const ESCALATE_AFTER_DAYS: i64 = 7;
/// Active uploads tracked at least this long are assumed reported.
pub const AWAITING_AFTER_DAYS: i64 = 2;

/// Classify a status lookup.
///
/// Checked in order: missing, private, password protected, rejected by
/// moderation, otherwise active.
pub fn classify_status(
    exists: bool,
    private: bool,
    password_protected: bool,
    moderation_state: Option<&str>,
) -> ApiStatus {
    if !exists {
        ApiStatus::Removed
    } else if private {
        ApiStatus::Private
    } else if password_protected {
        ApiStatus::PasswordProtected
    } else if moderation_state == Some(REJECTED_STATE) {
        ApiStatus::Rejected
    } else {
        ApiStatus::Active
    }
}

/// What the operator should do next about a tracked video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionHint {
    Removed,
    MadePrivate,
    PasswordProtected,
    Rejected,
    /// Still online a week after detection.
    Escalate,
    /// Reported, waiting for the platform.
    AwaitingTakedown,
    ReportNow,
    /// Never checked.
    Unknown,
}

impl ActionHint {
    pub fn for_video(status: Option<ApiStatus>, days_tracked: i64) -> Self {
        match status {
            Some(ApiStatus::Removed) => Self::Removed,
            Some(ApiStatus::Private) => Self::MadePrivate,
            Some(ApiStatus::PasswordProtected) => Self::PasswordProtected,
            Some(ApiStatus::Rejected) => Self::Rejected,
            Some(ApiStatus::Active) if days_tracked >= ESCALATE_AFTER_DAYS => Self::Escalate,
            Some(ApiStatus::Active) if days_tracked >= AWAITING_AFTER_DAYS => {
                Self::AwaitingTakedown
            }
            Some(ApiStatus::Active) => Self::ReportNow,
            None => Self::Unknown,
        }
    }

    /// Label shown to operators in the status sheet.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Removed => "已下架 ✓",
            Self::MadePrivate => "已变私密 ✓",
            Self::PasswordProtected => "已加密码保护 ✓",
            Self::Rejected => "被平台拒绝 ✓",
            Self::Escalate => "需要催办 ⚠",
            Self::AwaitingTakedown => "假设已举报，等待处理",
            Self::ReportNow => "需要举报",
            Self::Unknown => "未知状态",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            Self::Removed | Self::MadePrivate | Self::PasswordProtected | Self::Rejected
        )
    }

    /// Sort rank: escalations first, then anything needing a report,
    /// resolved videos last.
    pub fn priority(&self) -> u8 {
        if self.is_resolved() {
            return 3;
        }
        match self {
            Self::Escalate => 0,
            Self::Unknown => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for ActionHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One line of the status-update sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRow {
    pub platform: String,
    pub video_id: String,
    pub title: String,
    pub url: Option<String>,
    pub uploader: Option<String>,
    pub first_seen: NaiveDate,
    pub days_tracked: i64,
    pub api_status: Option<ApiStatus>,
    pub last_checked: Option<NaiveDate>,
    pub action: ActionHint,
}

impl StatusRow {
    pub fn from_video(video: &VideoRecord, today: NaiveDate) -> Self {
        let days_tracked = video.days_tracked(today);
        Self {
            platform: video.platform.clone(),
            video_id: video.video_id.clone(),
            title: video.title.clone(),
            url: video.url.clone(),
            uploader: video.uploader.clone(),
            first_seen: video.first_seen,
            days_tracked,
            api_status: video.api_status,
            last_checked: video.api_last_checked,
            action: ActionHint::for_video(video.api_status, days_tracked),
        }
    }
}

/// Build and order the status sheet: by action priority, then longest
/// tracked first.
pub fn status_rows(videos: &[VideoRecord], today: NaiveDate) -> Vec<StatusRow> {
    let mut rows: Vec<StatusRow> = videos
        .iter()
        .map(|v| StatusRow::from_video(v, today))
        .collect();
    rows.sort_by_key(|r| (r.action.priority(), Reverse(r.days_tracked)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, first_seen: NaiveDate, status: Option<ApiStatus>) -> VideoRecord {
        VideoRecord {
            platform: "dailymotion".into(),
            video_id: id.into(),
            url: None,
            title: id.into(),
            uploader: None,
            duration_sec: None,
            publish_time: None,
            views: None,
            raw_score: 1.5,
            score: 9.0,
            series_id: "s1".into(),
            series_name: "Moonlight Legend".into(),
            source_term: "Moonlight Legend".into(),
            first_seen,
            api_status: status,
            api_last_checked: None,
            ignore_reason: None,
            blocked_regions: vec![],
        }
    }

    #[test]
    fn test_classification_order() {
        assert_eq!(classify_status(false, true, true, Some("rejected")), ApiStatus::Removed);
        assert_eq!(classify_status(true, true, true, None), ApiStatus::Private);
        assert_eq!(classify_status(true, false, true, None), ApiStatus::PasswordProtected);
        assert_eq!(classify_status(true, false, false, Some("rejected")), ApiStatus::Rejected);
        assert_eq!(classify_status(true, false, false, Some("ready")), ApiStatus::Active);
        assert_eq!(classify_status(true, false, false, None), ApiStatus::Active);
    }

    #[test]
    fn test_action_hints_by_age() {
        let active = Some(ApiStatus::Active);
        assert_eq!(ActionHint::for_video(active, 0), ActionHint::ReportNow);
        assert_eq!(ActionHint::for_video(active, 1), ActionHint::ReportNow);
        assert_eq!(ActionHint::for_video(active, 2), ActionHint::AwaitingTakedown);
        assert_eq!(ActionHint::for_video(active, 6), ActionHint::AwaitingTakedown);
        assert_eq!(ActionHint::for_video(active, 7), ActionHint::Escalate);
        assert_eq!(ActionHint::for_video(Some(ApiStatus::Removed), 30), ActionHint::Removed);
        assert_eq!(ActionHint::for_video(None, 30), ActionHint::Unknown);
        assert!(ActionHint::Rejected.is_resolved());
        assert!(!ActionHint::Escalate.is_resolved());
    }

    #[test]
    fn test_status_rows_sorted_by_priority_then_age() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let days_ago = |d: i64| today - chrono::Duration::days(d);
        let videos = vec![
            video("removed_old", days_ago(20), Some(ApiStatus::Removed)),
            video("report_new", days_ago(1), Some(ApiStatus::Active)),
            video("escalate_8", days_ago(8), Some(ApiStatus::Active)),
            video("awaiting_3", days_ago(3), Some(ApiStatus::Active)),
            video("escalate_12", days_ago(12), Some(ApiStatus::Active)),
            video("unchecked", days_ago(5), None),
        ];

        let order: Vec<String> = status_rows(&videos, today)
            .into_iter()
            .map(|r| r.video_id)
            .collect();
        assert_eq!(
            order,
            vec!["escalate_12", "escalate_8", "awaiting_3", "report_new", "unchecked", "removed_old"]
        );
    }
}
