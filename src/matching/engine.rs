use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matching::config::{MatchingConfig, ACCEPTANCE_THRESHOLD};
use crate::matching::gating::failed_hard_filters;
use crate::matching::scoring::{
    score_competition, score_easy_apply, score_keywords, score_recency, score_remote,
};
use crate::models::{FilterCriteria, Job, KeywordLogic};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub matches: bool,
    /// Normalized to [0, 1]; reported even when `matches` is false.
    pub score: f64,
    pub reasons: Vec<String>,
    pub failed_filters: Vec<String>,
}

/// Scores `job` against `filters` with the default weights.
pub fn match_job(job: &Job, filters: &FilterCriteria, now: DateTime<Utc>) -> MatchResult {
    match_job_with(job, filters, &MatchingConfig::default(), now)
}

pub fn match_job_with(
    job: &Job,
    filters: &FilterCriteria,
    config: &MatchingConfig,
    now: DateTime<Utc>,
) -> MatchResult {
    let failed_filters = failed_hard_filters(job, filters, now);

    let contributions = [
        score_keywords(job, filters, config),
        score_remote(job, filters, config),
        score_easy_apply(job, config),
        score_recency(job, now, config),
        score_competition(job, config),
    ];

    let mut points = 0.0;
    let mut reasons = Vec::new();
    for contribution in contributions {
        points += contribution.points;
        reasons.extend(contribution.reasons);
    }

    let max_points = config.max_points();
    let score = if max_points > 0.0 {
        (points / max_points).clamp(0.0, 1.0)
    } else {
        0.0
    };

    MatchResult {
        matches: failed_filters.is_empty() && score >= ACCEPTANCE_THRESHOLD,
        score,
        reasons,
        failed_filters,
    }
}

/// Recomputes and stores the derived fields on `job`, returning the full result.
pub fn score_job(
    job: &mut Job,
    filters: &FilterCriteria,
    config: &MatchingConfig,
    now: DateTime<Utc>,
) -> MatchResult {
    let result = match_job_with(job, filters, config, now);
    job.apply_match(result.score, result.reasons.clone());
    result
}

/// Queue-time keyword gate. Unlike scoring it also searches company and location.
pub fn keyword_prefilter(job: &Job, filters: &FilterCriteria) -> bool {
    let keywords = filters.normalized_keywords();
    if keywords.is_empty() {
        return true;
    }

    let text = format!(
        "{} {} {} {}",
        job.title, job.description, job.company, job.location
    )
    .to_lowercase();

    match filters.keyword_logic {
        KeywordLogic::Or => keywords.iter().any(|k| text.contains(k.as_str())),
        KeywordLogic::And => keywords.iter().all(|k| text.contains(k.as_str())),
    }
}
