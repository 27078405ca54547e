//! Hard filters. Any failure excludes the job regardless of its soft score.

use chrono::{DateTime, Utc};

use crate::models::{FilterCriteria, Job};

pub const COMPANY_EXCLUDED: &str = "company excluded";
pub const SALARY_BELOW_MINIMUM: &str = "salary below minimum";
pub const JOB_TYPE_NOT_ACCEPTED: &str = "job type not accepted";
pub const POSTED_TOO_LONG_AGO: &str = "posted too long ago";

/// Evaluates every hard filter and returns the reasons of those that failed,
/// in a fixed order.
pub fn failed_hard_filters(job: &Job, filters: &FilterCriteria, now: DateTime<Utc>) -> Vec<String> {
    let mut failed = Vec::new();

    if filters.is_company_excluded(&job.company) {
        failed.push(COMPANY_EXCLUDED.to_string());
    }

    if let (Some(minimum), Some(offered)) = (filters.salary_min, job.salary_max()) {
        if offered < minimum {
            failed.push(SALARY_BELOW_MINIMUM.to_string());
        }
    }

    // Unknown job types cannot be ruled out.
    if !filters.job_types.is_empty() {
        if let Some(job_type) = job.job_type {
            if !filters.job_types.contains(&job_type) {
                failed.push(JOB_TYPE_NOT_ACCEPTED.to_string());
            }
        }
    }

    if let Some(days) = filters.posted_within_days {
        if job.age_days(now) > f64::from(days) {
            failed.push(POSTED_TOO_LONG_AGO.to_string());
        }
    }

    failed
}
