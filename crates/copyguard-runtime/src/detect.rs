//! Detection run: catalog keywords → platform search → scored, filtered,
//! stored candidates and the day's detection sheets.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use copyguard_api::traits::{SearchHit, VideoPlatform};
use copyguard_core::config::AppConfig;
use copyguard_core::keywords::build_series_keywords;
use copyguard_core::models::{Candidate, Catalog, VideoRecord};
use copyguard_core::report::{self, DetectionRow, DetectionStatus};
use copyguard_core::scoring::RelevanceScorer;

use crate::{DbHandle, RuntimeError};

/// Upper end of the reported score scale.
pub const MAX_SCORE: f64 = 10.0;

/// Map a raw relevance score onto `0..=10`.
pub fn scale_score(raw: f64, scale: f64) -> f64 {
    (raw * scale).clamp(0.0, MAX_SCORE)
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Counts and outputs of one detection run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectSummary {
    pub series: usize,
    pub terms: usize,
    pub raw_hits: usize,
    pub unique: usize,
    pub duration_filtered: usize,
    pub score_filtered: usize,
    pub passed: usize,
    pub new: usize,
    pub existing: usize,
    pub candidates_csv: Option<PathBuf>,
    pub new_detections_csv: Option<PathBuf>,
}

/// A candidate with its scores.
struct Scored {
    candidate: Candidate,
    raw_score: f64,
    score: f64,
}

#[tracing::instrument(name = "detect", skip_all, fields(platform = platform.name(), today = %today))]
pub async fn run_detection<P: VideoPlatform>(
    platform: &P,
    db: &DbHandle,
    catalog: &Catalog,
    config: &AppConfig,
    today: NaiveDate,
) -> Result<DetectSummary, RuntimeError> {
    let mut summary = DetectSummary::default();

    let mut plan = build_series_keywords(catalog, &config.keywords);
    plan.retain_series(&config.search.series_ids);
    if plan.is_empty() {
        tracing::warn!("No series with keywords; nothing to search");
        return Ok(summary);
    }
    summary.series = plan.series.len();

    // ── Search ──────────────────────────────────────────────────

    let titles = catalog.titles_by_series();
    let search = &config.search;
    let sleep = Duration::from_millis(search.sleep_ms);
    let mut candidates: Vec<Candidate> = Vec::new();

    for (idx, series) in plan.series.iter().enumerate() {
        let title_hint = titles
            .get(series.series_id.as_str())
            .copied()
            .or_else(|| series.alias_terms.first().map(String::as_str))
            .unwrap_or(series.series_id.as_str());
        tracing::info!(
            series = idx + 1,
            of = summary.series,
            title = title_hint,
            terms = series.search_terms.len(),
            "Searching series"
        );

        let primary = search.primary_aliases.min(series.search_terms.len());
        for (i, term) in series.search_terms.iter().enumerate() {
            let limit = if i < primary {
                search.primary_limit()
            } else {
                search.per_term_limit
            };
            summary.terms += 1;

            let result = platform.search(term, limit).await;
            tokio::time::sleep(sleep).await;
            let hits = match result {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!(term = %term, error = %e, "Search failed");
                    continue;
                }
            };
            summary.raw_hits += hits.len();
            candidates.extend(
                hits.into_iter()
                    .map(|h| to_candidate(h, platform.name(), &series.series_id)),
            );
        }
    }

    // ── Dedupe, score, filter ───────────────────────────────────

    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(c.key()));
    summary.unique = candidates.len();
    tracing::info!(raw = summary.raw_hits, unique = summary.unique, "Candidates collected");

    let aliases = plan.aliases_by_series();
    let scorer = RelevanceScorer::new(config.scoring.similarity_backend);
    let scale = config.scoring.effective_scale();
    let min_duration = config.scoring.min_duration_sec;
    let min_score = config.scoring.min_score;

    let mut passing: Vec<Scored> = Vec::new();
    for candidate in candidates {
        let series_aliases = aliases
            .get(candidate.series_id.as_str())
            .copied()
            .unwrap_or_default();
        let raw_score = scorer.score(&candidate.title, series_aliases);
        let score = scale_score(raw_score, scale);

        if min_duration > 0 && candidate.duration_sec.unwrap_or(0) < min_duration {
            summary.duration_filtered += 1;
            continue;
        }
        if min_score > 0.0 && score < min_score {
            summary.score_filtered += 1;
            continue;
        }
        passing.push(Scored {
            candidate,
            raw_score,
            score,
        });
    }
    summary.passed = passing.len();
    tracing::info!(
        passed = summary.passed,
        duration_filtered = summary.duration_filtered,
        score_filtered = summary.score_filtered,
        "Candidates filtered"
    );

    // ── Store ───────────────────────────────────────────────────

    let ids: Vec<String> = passing
        .iter()
        .map(|s| s.candidate.video_id.clone())
        .collect();
    let existing = db
        .existing_video_ids(platform.name(), ids)
        .await
        .map_err(|e| RuntimeError::Database(e.to_string()))?;

    let mut rows = Vec::with_capacity(passing.len());
    let mut new_records = Vec::new();
    for s in passing {
        let is_new = !existing.contains(&s.candidate.video_id);
        rows.push(DetectionRow {
            platform: s.candidate.platform.clone(),
            video_id: s.candidate.video_id.clone(),
            title: s.candidate.title.clone(),
            url: s.candidate.url.clone(),
            uploader: s.candidate.uploader.clone(),
            duration_sec: s.candidate.duration_sec.unwrap_or(0),
            score: s.score,
            status: if is_new {
                DetectionStatus::New
            } else {
                DetectionStatus::Existing
            },
        });
        if is_new {
            let series_name = titles
                .get(s.candidate.series_id.as_str())
                .copied()
                .unwrap_or_default()
                .to_string();
            new_records.push(to_record(s, series_name, today));
        }
    }
    summary.new = new_records.len();
    summary.existing = rows.len() - summary.new;

    if !new_records.is_empty() {
        let inserted = db
            .insert_new_videos(new_records)
            .await
            .map_err(|e| RuntimeError::Database(e.to_string()))?;
        tracing::info!(inserted, "New videos stored");
    }

    // ── Sheets ──────────────────────────────────────────────────

    report::sort_by_score(&mut rows);
    let dir = &config.general.report_dir;
    let candidates_path = report::candidates_path(dir, platform.name(), today);
    report::write_csv(&candidates_path, &rows).map_err(|e| RuntimeError::Report(e.to_string()))?;
    summary.candidates_csv = Some(candidates_path);

    let new_rows: Vec<DetectionRow> = rows
        .into_iter()
        .filter(|r| r.status == DetectionStatus::New)
        .collect();
    if !new_rows.is_empty() {
        let path = report::new_detections_path(dir, today);
        report::write_csv(&path, &new_rows).map_err(|e| RuntimeError::Report(e.to_string()))?;
        summary.new_detections_csv = Some(path);
    }

    tracing::info!(new = summary.new, existing = summary.existing, "Detection finished");
    Ok(summary)
}

fn to_candidate(hit: SearchHit, platform: &str, series_id: &str) -> Candidate {
    Candidate {
        platform: platform.to_string(),
        video_id: hit.video_id,
        title: hit.title,
        url: hit.url,
        uploader: hit.owner_username,
        duration_sec: hit.duration_sec,
        publish_time: hit.created_time,
        views: hit.views,
        source_term: hit.source_term,
        series_id: series_id.to_string(),
    }
}

fn to_record(scored: Scored, series_name: String, today: NaiveDate) -> VideoRecord {
    let c = scored.candidate;
    VideoRecord {
        platform: c.platform,
        video_id: c.video_id,
        url: c.url,
        title: c.title,
        uploader: c.uploader,
        duration_sec: c.duration_sec,
        publish_time: c.publish_time,
        views: c.views,
        raw_score: round3(scored.raw_score),
        score: round3(scored.score),
        series_id: c.series_id,
        series_name,
        source_term: c.source_term,
        first_seen: today,
        api_status: None,
        api_last_checked: None,
        ignore_reason: None,
        blocked_regions: Vec::new(),
    }
}
