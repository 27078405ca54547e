use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Largest accepted `errorSlowdownFactor`.
pub const MAX_SLOWDOWN_FACTOR: f64 = 10.0;

/// Local-clock window in which a run may be started. `end` before `start` wraps midnight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingHours {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl WorkingHours {
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start == self.end {
            return true;
        }
        if self.start < self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

/// Forced pause after a randomized run of consecutive applications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreakPattern {
    pub min_applications: u32,
    pub max_applications: u32,
    pub break_duration_minutes: u32,
}

impl Default for BreakPattern {
    fn default() -> Self {
        Self {
            min_applications: 5,
            max_applications: 10,
            break_duration_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PacingConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub daily_limit: u32,
    pub session_limit: u32,
    pub working_hours: Option<WorkingHours>,
    pub break_pattern: Option<BreakPattern>,
    pub max_session_duration_minutes: Option<u32>,
    /// Re-poll interval while the queue is empty
    pub idle_interval_ms: u64,
    /// Multiplier for the delay that follows a non-fatal error
    pub error_slowdown_factor: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 5_000,
            max_delay_ms: 15_000,
            daily_limit: 50,
            session_limit: 20,
            working_hours: None,
            break_pattern: Some(BreakPattern::default()),
            max_session_duration_minutes: Some(120),
            idle_interval_ms: 5_000,
            error_slowdown_factor: 2.0,
        }
    }
}

impl PacingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(format!(
                "minDelayMs ({}) exceeds maxDelayMs ({})",
                self.min_delay_ms, self.max_delay_ms
            ));
        }
        if self.daily_limit == 0 || self.session_limit == 0 {
            return Err("dailyLimit and sessionLimit must be greater than zero".into());
        }
        if let Some(pattern) = &self.break_pattern {
            if pattern.min_applications == 0 || pattern.min_applications > pattern.max_applications {
                return Err(format!(
                    "invalid break pattern range [{}, {}]",
                    pattern.min_applications, pattern.max_applications
                ));
            }
        }
        if !(1.0..=MAX_SLOWDOWN_FACTOR).contains(&self.error_slowdown_factor) {
            return Err(format!(
                "errorSlowdownFactor must be between 1.0 and {MAX_SLOWDOWN_FACTOR}"
            ));
        }
        Ok(())
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|err| D::Error::custom(format!("invalid time '{raw}': {err}")))
    }
}
