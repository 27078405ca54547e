use std::sync::RwLock;

use log::{error, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::AutomationError;
use crate::matching::MatchingConfig;
use crate::models::{ExperienceLevel, FilterCriteria, JobType, KeywordLogic, RemotePreference};
use crate::pacing::{BreakPattern, PacingConfig, WorkingHours};
use crate::records::Records;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AutomationConfig {
    pub filters: FilterCriteria,
    pub pacing: PacingConfig,
    pub matching: MatchingConfig,
}

impl AutomationConfig {
    pub fn validate(&self) -> Result<(), AutomationError> {
        self.pacing.validate().map_err(AutomationError::InvalidConfig)?;
        if self.matching.max_points() <= 0.0 {
            return Err(AutomationError::InvalidConfig(
                "matching weights must sum to a positive value".into(),
            ));
        }
        Ok(())
    }

    /// Applies every field present in `patch`, leaving the rest untouched.
    pub fn merge(&mut self, patch: ConfigPatch) {
        if let Some(filters) = patch.filters {
            filters.apply(&mut self.filters);
        }
        if let Some(pacing) = patch.pacing {
            pacing.apply(&mut self.pacing);
        }
        if let Some(matching) = patch.matching {
            self.matching = matching;
        }
    }
}

/// Partial update. Absent fields are kept; `null` clears optional settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub filters: Option<FilterPatch>,
    pub pacing: Option<PacingPatch>,
    pub matching: Option<MatchingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterPatch {
    pub remote_preference: Option<RemotePreference>,
    pub keywords: Option<Vec<String>>,
    pub keyword_logic: Option<KeywordLogic>,
    pub experience_level: Option<ExperienceLevel>,
    pub job_types: Option<Vec<JobType>>,
    #[serde(deserialize_with = "double_option")]
    pub posted_within_days: Option<Option<u32>>,
    #[serde(deserialize_with = "double_option")]
    pub salary_min: Option<Option<f64>>,
    pub excluded_companies: Option<Vec<String>>,
}

impl FilterPatch {
    fn apply(self, filters: &mut FilterCriteria) {
        if let Some(value) = self.remote_preference {
            filters.remote_preference = value;
        }
        if let Some(value) = self.keywords {
            filters.keywords = value;
        }
        if let Some(value) = self.keyword_logic {
            filters.keyword_logic = value;
        }
        if let Some(value) = self.experience_level {
            filters.experience_level = value;
        }
        if let Some(value) = self.job_types {
            filters.job_types = value;
        }
        if let Some(value) = self.posted_within_days {
            filters.posted_within_days = value;
        }
        if let Some(value) = self.salary_min {
            filters.salary_min = value;
        }
        if let Some(value) = self.excluded_companies {
            filters.excluded_companies = value;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PacingPatch {
    pub min_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub daily_limit: Option<u32>,
    pub session_limit: Option<u32>,
    #[serde(deserialize_with = "double_option")]
    pub working_hours: Option<Option<WorkingHours>>,
    #[serde(deserialize_with = "double_option")]
    pub break_pattern: Option<Option<BreakPattern>>,
    #[serde(deserialize_with = "double_option")]
    pub max_session_duration_minutes: Option<Option<u32>>,
    pub idle_interval_ms: Option<u64>,
    pub error_slowdown_factor: Option<f64>,
}

impl PacingPatch {
    fn apply(self, pacing: &mut PacingConfig) {
        if let Some(value) = self.min_delay_ms {
            pacing.min_delay_ms = value;
        }
        if let Some(value) = self.max_delay_ms {
            pacing.max_delay_ms = value;
        }
        if let Some(value) = self.daily_limit {
            pacing.daily_limit = value;
        }
        if let Some(value) = self.session_limit {
            pacing.session_limit = value;
        }
        if let Some(value) = self.working_hours {
            pacing.working_hours = value;
        }
        if let Some(value) = self.break_pattern {
            pacing.break_pattern = value;
        }
        if let Some(value) = self.max_session_duration_minutes {
            pacing.max_session_duration_minutes = value;
        }
        if let Some(value) = self.idle_interval_ms {
            pacing.idle_interval_ms = value;
        }
        if let Some(value) = self.error_slowdown_factor {
            pacing.error_slowdown_factor = value;
        }
    }
}

// Present-but-null must map to Some(None), which plain Option<Option<T>> loses.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Active configuration, backed by the `config` record.
pub struct ConfigStore {
    records: Records,
    data: RwLock<AutomationConfig>,
}

impl ConfigStore {
    pub async fn load(records: Records) -> Self {
        let data = records.load_config().await;
        let data = match data.validate() {
            Ok(()) => data,
            Err(err) => {
                warn!("Stored config rejected ({err}); using defaults");
                AutomationConfig::default()
            }
        };

        Self {
            records,
            data: RwLock::new(data),
        }
    }

    pub fn current(&self) -> AutomationConfig {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Merges, validates and persists. Nothing changes if validation fails;
    /// a failed write is logged and the in-memory config still updates.
    pub async fn update(&self, patch: ConfigPatch) -> Result<AutomationConfig, AutomationError> {
        let mut next = self.current();
        next.merge(patch);
        next.validate()?;

        {
            let mut guard = match self.data.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = next.clone();
        }

        if let Err(err) = self.records.save_config(&next).await {
            error!("Failed to persist config: {err:#}");
        }

        Ok(next)
    }
}
