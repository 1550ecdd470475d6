use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use super::error::DailymotionError;
use super::types::{SearchPage, StatusResponse, SEARCH_FIELDS, STATUS_FIELDS};
use crate::traits::{SearchHit, VideoPlatform, VideoStatus};

const BASE_URL: &str = "https://api.dailymotion.com/";
const USER_AGENT: &str = concat!("copyguard/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Largest page the search endpoint serves.
pub const MAX_PAGE_SIZE: usize = 100;

/// Dailymotion public Data API client (no authentication).
pub struct DailymotionClient {
    http: Client,
    base_url: Url,
    page_size: usize,
    page_delay: Duration,
}

impl DailymotionClient {
    pub fn new() -> Result<Self, DailymotionError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: Url::parse(BASE_URL)?,
            page_size: MAX_PAGE_SIZE,
            page_delay: Duration::from_millis(200),
        })
    }

    /// Point the client at another API root (a proxy or a local stub).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, DailymotionError> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        self.base_url = Url::parse(&base)?;
        Ok(self)
    }

    /// Results per page, capped at [`MAX_PAGE_SIZE`].
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Pause between consecutive pages of one search.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, DailymotionError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(DailymotionError::Api {
                status,
                message: body,
            })
        }
    }

    async fn fetch_page(
        &self,
        term: &str,
        page: usize,
        page_size: usize,
    ) -> Result<SearchPage, DailymotionError> {
        let resp = self
            .http
            .get(self.base_url.join("videos")?)
            .query(&[
                ("search", term),
                ("fields", &SEARCH_FIELDS.join(",")),
                ("limit", &page_size.to_string()),
                ("page", &page.to_string()),
                ("sort", "relevance"),
            ])
            .send()
            .await?;

        let resp = Self::check_response(resp).await?;
        resp.json()
            .await
            .map_err(|e| DailymotionError::Parse(e.to_string()))
    }

    /// Collect up to `limit` hits for one term, page by page.
    ///
    /// Stops at an empty page, when the API reports no more pages, or once
    /// `limit` is reached. A failed page is logged and ends the term with
    /// whatever was collected so far.
    #[tracing::instrument(name = "dailymotion.search", skip(self), fields(hits = tracing::field::Empty))]
    pub async fn search_videos(&self, term: &str, limit: usize) -> Vec<SearchHit> {
        let page_size = limit.min(self.page_size).max(1);
        let mut hits = Vec::new();
        let mut page = 1;

        while hits.len() < limit {
            let body = match self.fetch_page(term, page, page_size).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(term, page, error = %e, "Search page failed");
                    break;
                }
            };
            if body.list.is_empty() {
                break;
            }

            let remaining = limit - hits.len();
            hits.extend(
                body.list
                    .into_iter()
                    .filter_map(|item| item.into_search_hit(term))
                    .take(remaining),
            );

            if !body.has_more || hits.len() >= limit {
                break;
            }
            page += 1;
            tokio::time::sleep(self.page_delay).await;
        }

        tracing::Span::current().record("hits", hits.len());
        hits
    }

    /// Current status of a video. A 404 means the video is gone.
    pub async fn get_video_status(&self, video_id: &str) -> Result<VideoStatus, DailymotionError> {
        let url = self.base_url.join(&format!("video/{video_id}"))?;
        let resp = self
            .http
            .get(url)
            .query(&[("fields", STATUS_FIELDS.join(","))])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            tracing::debug!(video_id, "Video not found");
            return Ok(VideoStatus::missing());
        }

        let resp = Self::check_response(resp).await?;
        let body: StatusResponse = resp
            .json()
            .await
            .map_err(|e| DailymotionError::Parse(e.to_string()))?;
        Ok(body.into_video_status())
    }
}

impl VideoPlatform for DailymotionClient {
    type Error = DailymotionError;

    fn name(&self) -> &'static str {
        "dailymotion"
    }

    async fn search(&self, term: &str, limit: usize) -> Result<Vec<SearchHit>, DailymotionError> {
        Ok(self.search_videos(term, limit).await)
    }

    async fn video_status(&self, video_id: &str) -> Result<VideoStatus, DailymotionError> {
        self.get_video_status(video_id).await
    }
}
