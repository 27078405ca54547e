//! Records appended after every job attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::Job;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationStatus {
    Submitted,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub id: String,
    pub job_id: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub error_message: Option<String>,
    pub attempts: u32,
    // Denormalized from the job so statistics don't need a lookup.
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub match_score: Option<f64>,
}

impl ApplicationRecord {
    pub fn for_job(
        job: &Job,
        status: ApplicationStatus,
        error_message: Option<String>,
        attempts: u32,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job_id: job.id.clone(),
            status,
            applied_at,
            error_message,
            attempts: attempts.max(1),
            job_title: Some(job.title.clone()),
            company: Some(job.company.clone()),
            location: Some(job.location.clone()).filter(|l| !l.is_empty()),
            match_score: Some(job.match_score),
        }
    }

    /// Record for an outcome reported by job id alone, e.g. from the form collaborator.
    pub fn for_job_id(
        job_id: impl Into<String>,
        status: ApplicationStatus,
        error_message: Option<String>,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.into(),
            status,
            applied_at,
            error_message,
            attempts: 1,
            job_title: None,
            company: None,
            location: None,
            match_score: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedJob {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub reason: String,
    pub score: f64,
    pub skipped_at: DateTime<Utc>,
}

impl SkippedJob {
    pub fn new(job: &Job, reason: impl Into<String>, skipped_at: DateTime<Utc>) -> Self {
        Self {
            job_id: job.id.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            reason: reason.into(),
            score: job.match_score,
            skipped_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_are_at_least_one() {
        let job = Job::new("j1", "Engineer", "Acme", Utc::now());
        let record =
            ApplicationRecord::for_job(&job, ApplicationStatus::Failed, None, 0, Utc::now());
        assert_eq!(record.attempts, 1);
        assert_eq!(record.company.as_deref(), Some("Acme"));
        assert!(record.location.is_none());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ApplicationStatus::Submitted).unwrap();
        assert_eq!(json, "\"submitted\"");
    }
}
