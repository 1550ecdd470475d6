use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Availability of a tracked video as last observed through the platform API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiStatus {
    Active,
    Removed,
    Private,
    PasswordProtected,
    Rejected,
}

impl ApiStatus {
    /// Database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Removed => "removed",
            Self::Private => "private",
            Self::PasswordProtected => "password_protected",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "removed" => Some(Self::Removed),
            "private" => Some(Self::Private),
            "password_protected" => Some(Self::PasswordProtected),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Whether the video is no longer publicly watchable.
    pub fn is_taken_down(&self) -> bool {
        !matches!(self, Self::Active)
    }

    pub const ALL: &[ApiStatus] = &[
        Self::Active,
        Self::Removed,
        Self::Private,
        Self::PasswordProtected,
        Self::Rejected,
    ];
}

impl std::fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// A detected video as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub platform: String,
    pub video_id: String,
    pub url: Option<String>,
    pub title: String,
    pub uploader: Option<String>,
    pub duration_sec: Option<u64>,
    pub publish_time: Option<i64>,
    pub views: Option<u64>,
    pub raw_score: f64,
    pub score: f64,
    pub series_id: String,
    pub series_name: String,
    pub source_term: String,
    pub first_seen: NaiveDate,
    /// `None` until the first recheck.
    pub api_status: Option<ApiStatus>,
    pub api_last_checked: Option<NaiveDate>,
    pub ignore_reason: Option<String>,
    pub blocked_regions: Vec<String>,
}

impl VideoRecord {
    /// Whole days between `first_seen` and `today` (never negative).
    pub fn days_tracked(&self, today: NaiveDate) -> i64 {
        (today - self.first_seen).num_days().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_roundtrip() {
        for status in ApiStatus::ALL {
            assert_eq!(ApiStatus::from_db_str(status.as_db_str()), Some(*status));
        }
        assert_eq!(ApiStatus::from_db_str("unknown"), None);
    }

    #[test]
    fn test_taken_down() {
        assert!(!ApiStatus::Active.is_taken_down());
        assert!(ApiStatus::Removed.is_taken_down());
        assert!(ApiStatus::PasswordProtected.is_taken_down());
    }
}
