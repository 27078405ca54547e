//! Typed access to the persisted records: config, applications, statistics and
//! skipped jobs. Every write is read-modify-write on a whole record.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::AutomationConfig;
use crate::models::{ApplicationRecord, ApplicationStatus, SkippedJob};
use crate::storage::KeyValueStore;

pub const CONFIG_KEY: &str = "config";
pub const APPLICATIONS_KEY: &str = "applications";
pub const STATISTICS_KEY: &str = "statistics";
pub const SKIPPED_JOBS_KEY: &str = "skippedJobs";

const MAX_SKIPPED_JOBS: usize = 500;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Statistics {
    pub total_submitted: u64,
    pub total_failed: u64,
    pub total_skipped: u64,
    pub success_rate: f64,
    pub companies: BTreeMap<String, u64>,
    pub locations: BTreeMap<String, u64>,
    pub daily: Option<DailyCount>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Statistics {
    pub fn apply(&mut self, record: &ApplicationRecord) {
        match record.status {
            ApplicationStatus::Submitted => {
                self.total_submitted += 1;
                if let Some(company) = record.company.as_deref().filter(|c| !c.is_empty()) {
                    *self.companies.entry(company.to_string()).or_default() += 1;
                }
                if let Some(location) = record.location.as_deref().filter(|l| !l.is_empty()) {
                    *self.locations.entry(location.to_string()).or_default() += 1;
                }
            }
            ApplicationStatus::Failed => self.total_failed += 1,
            ApplicationStatus::Skipped => self.total_skipped += 1,
        }

        let attempted = self.total_submitted + self.total_failed;
        self.success_rate = if attempted == 0 {
            0.0
        } else {
            self.total_submitted as f64 / attempted as f64
        };
        self.last_updated = Some(record.applied_at);
    }

    pub fn top_companies(&self, n: usize) -> Vec<(String, u64)> {
        top_n(&self.companies, n)
    }

    pub fn top_locations(&self, n: usize) -> Vec<(String, u64)> {
        top_n(&self.locations, n)
    }
}

fn top_n(counts: &BTreeMap<String, u64>, n: usize) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> =
        counts.iter().map(|(name, count)| (name.clone(), *count)).collect();
    // BTreeMap order is alphabetical, so the stable sort breaks ties by name.
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(n);
    entries
}

#[derive(Clone)]
pub struct Records {
    store: Arc<dyn KeyValueStore>,
}

impl Records {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn read<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.store.get(key).await? {
            Some(value) => serde_json::from_value(value)
                .with_context(|| format!("record '{key}' has an unexpected shape")),
            None => Ok(T::default()),
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.store
            .set(key, value)
            .await
            .with_context(|| format!("failed to write record '{key}'"))
    }

    /// Stored config, or defaults when missing or unreadable.
    pub async fn load_config(&self) -> AutomationConfig {
        match self.read::<AutomationConfig>(CONFIG_KEY).await {
            Ok(config) => config,
            Err(err) => {
                warn!("Failed to load config, using defaults: {err:#}");
                AutomationConfig::default()
            }
        }
    }

    pub async fn save_config(&self, config: &AutomationConfig) -> Result<()> {
        self.write(CONFIG_KEY, config).await
    }

    pub async fn applications(&self) -> Result<Vec<ApplicationRecord>> {
        self.read(APPLICATIONS_KEY).await
    }

    /// Appends the record and folds it into the statistics.
    pub async fn append_application(&self, record: &ApplicationRecord) -> Result<Statistics> {
        let mut applications = self.applications().await?;
        applications.push(record.clone());
        self.write(APPLICATIONS_KEY, &applications).await?;

        let mut statistics = self.statistics().await?;
        statistics.apply(record);
        self.write(STATISTICS_KEY, &statistics).await?;
        Ok(statistics)
    }

    pub async fn skipped_jobs(&self) -> Result<Vec<SkippedJob>> {
        self.read(SKIPPED_JOBS_KEY).await
    }

    /// Keeps only the newest entries.
    pub async fn append_skipped(&self, skipped: &SkippedJob) -> Result<()> {
        let mut jobs = self.skipped_jobs().await?;
        jobs.push(skipped.clone());
        if jobs.len() > MAX_SKIPPED_JOBS {
            let excess = jobs.len() - MAX_SKIPPED_JOBS;
            jobs.drain(..excess);
        }
        self.write(SKIPPED_JOBS_KEY, &jobs).await
    }

    pub async fn statistics(&self) -> Result<Statistics> {
        self.read(STATISTICS_KEY).await
    }

    pub async fn save_daily_count(&self, daily: DailyCount) -> Result<()> {
        let mut statistics = self.statistics().await?;
        statistics.daily = Some(daily);
        self.write(STATISTICS_KEY, &statistics).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Job;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn records() -> (MemoryStore, Records) {
        let store = MemoryStore::new();
        let records = Records::new(Arc::new(store.clone()));
        (store, records)
    }

    fn record(company: &str, location: &str, status: ApplicationStatus) -> ApplicationRecord {
        let mut job = Job::new(format!("{company}-{location}"), "Engineer", company, Utc::now());
        job.location = location.into();
        ApplicationRecord::for_job(&job, status, None, 1, Utc::now())
    }

    #[tokio::test]
    async fn append_updates_statistics() {
        let (_, records) = records();
        records
            .append_application(&record("Acme", "Remote", ApplicationStatus::Submitted))
            .await
            .unwrap();
        records
            .append_application(&record("Acme", "Berlin", ApplicationStatus::Submitted))
            .await
            .unwrap();
        records
            .append_application(&record("Initech", "Berlin", ApplicationStatus::Submitted))
            .await
            .unwrap();
        let stats = records
            .append_application(&record("Globex", "Paris", ApplicationStatus::Failed))
            .await
            .unwrap();

        assert_eq!(records.applications().await.unwrap().len(), 4);
        assert_eq!(stats.total_submitted, 3);
        assert_eq!(stats.total_failed, 1);
        assert!((stats.success_rate - 0.75).abs() < 1e-9);
        assert_eq!(
            stats.top_companies(2),
            vec![("Acme".to_string(), 2), ("Initech".to_string(), 1)]
        );
        assert_eq!(stats.top_locations(1), vec![("Berlin".to_string(), 2)]);
        assert_eq!(records.statistics().await.unwrap(), stats);
    }

    #[tokio::test]
    async fn skipped_jobs_are_capped() {
        let (_, records) = records();
        let job = Job::new("j", "Engineer", "Acme", Utc::now());
        for n in 0..(MAX_SKIPPED_JOBS + 3) {
            let mut skipped = SkippedJob::new(&job, "not easy apply", Utc::now());
            skipped.job_id = n.to_string();
            records.append_skipped(&skipped).await.unwrap();
        }
        let jobs = records.skipped_jobs().await.unwrap();
        assert_eq!(jobs.len(), MAX_SKIPPED_JOBS);
        assert_eq!(jobs[0].job_id, "3");
    }

    #[tokio::test]
    async fn unreadable_config_falls_back_to_defaults() {
        let (store, records) = records();
        store
            .set(CONFIG_KEY, json!({"pacing": {"dailyLimit": "lots"}}))
            .await
            .unwrap();
        assert_eq!(records.load_config().await, AutomationConfig::default());
    }

    #[tokio::test]
    async fn daily_count_is_kept_in_statistics() {
        let (_, records) = records();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        records
            .save_daily_count(DailyCount { date, count: 4 })
            .await
            .unwrap();
        assert_eq!(
            records.statistics().await.unwrap().daily,
            Some(DailyCount { date, count: 4 })
        );
    }
}
