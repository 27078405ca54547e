use chrono::{DateTime, Utc};

use crate::matching::config::MatchingConfig;
use crate::models::{FilterCriteria, Job, KeywordLogic, RemotePreference};

/// Points awarded by one soft criterion plus the reasons explaining them.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub points: f64,
    pub reasons: Vec<String>,
}

impl Contribution {
    fn none() -> Self {
        Self {
            points: 0.0,
            reasons: Vec::new(),
        }
    }

    fn with_reason(points: f64, reason: String) -> Self {
        Self {
            points,
            reasons: vec![reason],
        }
    }
}

/// Lowercased `title + description`, the text keywords are scored against.
pub fn scoring_text(job: &Job) -> String {
    format!("{} {}", job.title, job.description).to_lowercase()
}

/// Keyword criterion. OR scales with the fraction found, AND is all or nothing.
/// With no keywords configured the criterion is satisfied.
pub fn score_keywords(job: &Job, filters: &FilterCriteria, config: &MatchingConfig) -> Contribution {
    let keywords = filters.normalized_keywords();
    if keywords.is_empty() {
        return Contribution::with_reason(config.weight_keywords, "no keyword filter".into());
    }

    let text = scoring_text(job);
    let found: Vec<&String> = keywords.iter().filter(|k| text.contains(k.as_str())).collect();
    if found.is_empty() {
        return Contribution::none();
    }

    let points = match filters.keyword_logic {
        KeywordLogic::Or => config.weight_keywords * found.len() as f64 / keywords.len() as f64,
        KeywordLogic::And if found.len() == keywords.len() => config.weight_keywords,
        KeywordLogic::And => return Contribution::none(),
    };

    Contribution {
        points,
        reasons: found
            .into_iter()
            .map(|keyword| format!("keyword match: {keyword}"))
            .collect(),
    }
}

/// Remote criterion: credit only when the user asked for remote and the job is remote.
pub fn score_remote(job: &Job, filters: &FilterCriteria, config: &MatchingConfig) -> Contribution {
    if filters.remote_preference == RemotePreference::Yes && job.is_remote {
        Contribution::with_reason(config.weight_remote, "remote position".into())
    } else {
        Contribution::none()
    }
}

pub fn score_easy_apply(job: &Job, config: &MatchingConfig) -> Contribution {
    if job.is_easy_apply {
        Contribution::with_reason(config.weight_easy_apply, "easy apply".into())
    } else {
        Contribution::none()
    }
}

/// Recency: full credit for fresh listings, half for listings up to a week old.
pub fn score_recency(job: &Job, now: DateTime<Utc>, config: &MatchingConfig) -> Contribution {
    let age = job.age_days(now);
    if age <= config.recent_full_days {
        Contribution::with_reason(
            config.weight_recency,
            format!("posted within {} days", config.recent_full_days),
        )
    } else if age <= config.recent_half_days {
        Contribution::with_reason(
            config.weight_recency / 2.0,
            format!("posted within {} days", config.recent_half_days),
        )
    } else {
        Contribution::none()
    }
}

/// Low competition. An unknown applicant count earns nothing.
pub fn score_competition(job: &Job, config: &MatchingConfig) -> Contribution {
    match job.applicant_count {
        Some(count) if count < config.low_competition_below => Contribution::with_reason(
            config.weight_competition,
            format!("low competition ({count} applicants)"),
        ),
        Some(count) if count < config.moderate_competition_below => Contribution::with_reason(
            config.weight_competition / 2.0,
            format!("moderate competition ({count} applicants)"),
        ),
        _ => Contribution::none(),
    }
}
