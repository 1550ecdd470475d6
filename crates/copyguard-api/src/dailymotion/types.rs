use serde::Deserialize;

use crate::traits::{Geoblocking, SearchHit, VideoStatus};

/// Fields requested for every search hit.
pub const SEARCH_FIELDS: &[&str] = &[
    "id",
    "title",
    "url",
    "owner.username",
    "owner.id",
    "duration",
    "created_time",
    "views_total",
];

/// Fields requested for a status lookup.
pub const STATUS_FIELDS: &[&str] = &[
    "id",
    "private",
    "password_protected",
    "status",
    "published",
    "geoblocking",
    "views_total",
    "updated_time",
    "duration",
];

// ── Search ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub list: Vec<VideoItem>,
    #[serde(default)]
    pub has_more: bool,
}

/// One video of a search page. Dotted field selectors come back as
/// literal dotted keys.
#[derive(Debug, Deserialize)]
pub struct VideoItem {
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "owner.username")]
    pub owner_username: Option<String>,
    #[serde(rename = "owner.id")]
    pub owner_id: Option<String>,
    pub duration: Option<u64>,
    pub created_time: Option<i64>,
    pub views_total: Option<u64>,
}

impl VideoItem {
    /// Convert to a [`SearchHit`]; items without an id are dropped.
    pub fn into_search_hit(self, term: &str) -> Option<SearchHit> {
        let video_id = self.id.filter(|id| !id.is_empty())?;
        Some(SearchHit {
            video_id,
            title: self.title.unwrap_or_default(),
            url: self.url,
            owner_username: self.owner_username,
            owner_id: self.owner_id,
            duration_sec: self.duration,
            created_time: self.created_time,
            views: self.views_total,
            source_term: term.to_string(),
        })
    }
}

// ── Status ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub password_protected: bool,
    pub status: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub geoblocking: Option<Vec<String>>,
    pub views_total: Option<u64>,
    pub updated_time: Option<i64>,
    pub duration: Option<u64>,
}

impl StatusResponse {
    pub fn into_video_status(self) -> VideoStatus {
        VideoStatus {
            exists: true,
            private: self.private,
            password_protected: self.password_protected,
            status: self.status.filter(|s| !s.is_empty()),
            published: self.published,
            geoblocking: Geoblocking::parse(&self.geoblocking.unwrap_or_default()),
            views: self.views_total,
            updated_time: self.updated_time,
            duration_sec: self.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_search_page() {
        let json = r#"{
            "page": 1,
            "limit": 100,
            "has_more": true,
            "list": [
                {
                    "id": "x8abcd1",
                    "title": "Moonlight Legend EP1 Full",
                    "url": "https://www.dailymotion.com/video/x8abcd1",
                    "owner.username": "uploader42",
                    "owner.id": "x2owner",
                    "duration": 3120,
                    "created_time": 1718000000,
                    "views_total": 1500
                },
                { "title": "no id here" }
            ]
        }"#;
        let page: SearchPage = serde_json::from_str(json).unwrap();
        assert!(page.has_more);
        assert_eq!(page.list.len(), 2);

        let hits: Vec<SearchHit> = page
            .list
            .into_iter()
            .filter_map(|item| item.into_search_hit("Moonlight Legend"))
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].video_id, "x8abcd1");
        assert_eq!(hits[0].owner_username.as_deref(), Some("uploader42"));
        assert_eq!(hits[0].duration_sec, Some(3120));
        assert_eq!(hits[0].source_term, "Moonlight Legend");
    }

    #[test]
    fn test_deserialize_empty_page() {
        let page: SearchPage = serde_json::from_str(r#"{"list": []}"#).unwrap();
        assert!(page.list.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_deserialize_status() {
        let json = r#"{
            "id": "x8abcd1",
            "private": false,
            "password_protected": false,
            "status": "rejected",
            "published": true,
            "geoblocking": ["deny", "CN"],
            "views_total": 10,
            "updated_time": 1718000500,
            "duration": 3120
        }"#;
        let status = serde_json::from_str::<StatusResponse>(json)
            .unwrap()
            .into_video_status();
        assert!(status.exists);
        assert_eq!(status.status.as_deref(), Some("rejected"));
        assert_eq!(status.geoblocking.blocked, vec!["CN"]);
        assert!(status.published);
    }

    #[test]
    fn test_status_defaults_when_fields_absent() {
        let status = serde_json::from_str::<StatusResponse>(r#"{"id": "x1"}"#)
            .unwrap()
            .into_video_status();
        assert!(status.exists);
        assert!(!status.private);
        assert_eq!(status.status, None);
        assert!(status.geoblocking.is_unrestricted());
    }
}
