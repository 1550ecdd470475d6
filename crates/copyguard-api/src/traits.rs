//! Trait definitions for video hosting platforms.
//!
//! Detection and recheck pipelines only talk to [`VideoPlatform`], so a
//! platform client can be swapped (or faked in tests) without touching
//! them.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// A searchable video hosting platform.
pub trait VideoPlatform: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short platform name stored alongside every video (`"dailymotion"`).
    fn name(&self) -> &'static str;

    /// Search for videos matching `term`, returning at most `limit` hits in
    /// relevance order.
    fn search(
        &self,
        term: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SearchHit>, Self::Error>> + Send;

    /// Look up the current availability of one video.
    fn video_status(
        &self,
        video_id: &str,
    ) -> impl Future<Output = Result<VideoStatus, Self::Error>> + Send;
}

/// A video returned by a platform search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub video_id: String,
    pub title: String,
    pub url: Option<String>,
    pub owner_username: Option<String>,
    pub owner_id: Option<String>,
    pub duration_sec: Option<u64>,
    /// Unix timestamp of upload.
    pub created_time: Option<i64>,
    pub views: Option<u64>,
    /// Search term that produced this hit.
    pub source_term: String,
}

/// Availability of a video as reported by the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoStatus {
    /// False when the platform no longer knows the video.
    pub exists: bool,
    pub private: bool,
    pub password_protected: bool,
    /// Platform moderation/processing state (`"ready"`, `"rejected"`, …).
    pub status: Option<String>,
    pub published: bool,
    pub geoblocking: Geoblocking,
    pub views: Option<u64>,
    pub updated_time: Option<i64>,
    pub duration_sec: Option<u64>,
}

impl VideoStatus {
    /// Status of a video that no longer exists.
    pub fn missing() -> Self {
        Self::default()
    }
}

/// Region restrictions of a video.
///
/// Both lists empty means available everywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geoblocking {
    /// Regions where the video is blocked (deny list).
    pub blocked: Vec<String>,
    /// Only regions where the video is available (allow list).
    pub available: Vec<String>,
}

impl Geoblocking {
    /// Parse a `["deny" | "allow", region, ...]` list.
    ///
    /// An empty list, a bare `"allow"` or an unknown mode means no
    /// restriction is recorded for the unknown part.
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Self {
        let Some((mode, regions)) = raw.split_first() else {
            return Self::default();
        };
        let regions: Vec<String> = regions
            .iter()
            .map(|r| r.as_ref().trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        match mode.as_ref().trim().to_ascii_lowercase().as_str() {
            "deny" => Self {
                blocked: regions,
                available: Vec::new(),
            },
            _ => Self {
                blocked: Vec::new(),
                available: regions,
            },
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.blocked.is_empty() && self.available.is_empty()
    }
}
