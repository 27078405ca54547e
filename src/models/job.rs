//! Job listings as reported by the page analyzer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filters::{ExperienceLevel, JobType};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SalaryPeriod {
    Hourly,
    Monthly,
    Yearly,
}

impl Default for SalaryPeriod {
    fn default() -> Self {
        SalaryPeriod::Yearly
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub period: SalaryPeriod,
}

fn default_currency() -> String {
    "USD".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_remote: bool,
    #[serde(default)]
    pub salary_range: Option<SalaryRange>,
    pub posted_date: DateTime<Utc>,
    #[serde(default)]
    pub applicant_count: Option<u32>,
    #[serde(default)]
    pub is_easy_apply: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default)]
    pub url: Option<String>,
    /// Derived by the matching engine; zero until scored.
    #[serde(default)]
    pub match_score: f64,
    #[serde(default)]
    pub match_reasons: Vec<String>,
}

impl Job {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        company: impl Into<String>,
        posted_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            company: company.into(),
            location: String::new(),
            is_remote: false,
            salary_range: None,
            posted_date,
            applicant_count: None,
            is_easy_apply: false,
            description: String::new(),
            job_type: None,
            experience_level: None,
            url: None,
            match_score: 0.0,
            match_reasons: Vec::new(),
        }
    }

    /// Upper end of the advertised salary, if the listing gives one.
    pub fn salary_max(&self) -> Option<f64> {
        self.salary_range.as_ref().and_then(|range| range.max)
    }

    /// Age of the listing in fractional days. Listings dated in the future count as zero.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (now - self.posted_date).num_seconds().max(0);
        seconds as f64 / 86_400.0
    }

    /// Replaces both derived fields at once so they are never partially stale.
    pub fn apply_match(&mut self, score: f64, reasons: Vec<String>) {
        self.match_score = score;
        self.match_reasons = reasons;
    }
}
