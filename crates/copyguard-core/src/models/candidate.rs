use serde::{Deserialize, Serialize};

/// A video returned by a platform search, not yet judged relevant.
///
/// Lives for one detection run. Only `title` feeds the scorer; the rest is
/// carried through to storage and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub platform: String,
    pub video_id: String,
    pub title: String,
    pub url: Option<String>,
    pub uploader: Option<String>,
    pub duration_sec: Option<u64>,
    /// Unix timestamp of publication.
    pub publish_time: Option<i64>,
    pub views: Option<u64>,
    /// Keyword that produced this hit.
    pub source_term: String,
    /// Catalog entry the keyword belongs to.
    pub series_id: String,
}

impl Candidate {
    /// Cross-platform identity used for run-level deduplication.
    pub fn key(&self) -> String {
        format!("{}:{}", self.platform, self.video_id)
    }
}
