use serde::{Deserialize, Serialize};

/// Minimum normalized score a job needs to be accepted for application.
pub const ACCEPTANCE_THRESHOLD: f64 = 0.5;

/// Weights and cut-offs for the soft score. Weights are points out of their sum
/// (100 with the defaults).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchingConfig {
    pub weight_keywords: f64,
    pub weight_remote: f64,
    pub weight_easy_apply: f64,
    pub weight_recency: f64,
    pub weight_competition: f64,

    /// Full recency credit at or below this age
    pub recent_full_days: f64,
    /// Half recency credit at or below this age
    pub recent_half_days: f64,

    /// Full competition credit below this many applicants
    pub low_competition_below: u32,
    /// Half competition credit below this many applicants
    pub moderate_competition_below: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            weight_keywords: 40.0,
            weight_remote: 20.0,
            weight_easy_apply: 20.0,
            weight_recency: 10.0,
            weight_competition: 10.0,
            recent_full_days: 3.0,
            recent_half_days: 7.0,
            low_competition_below: 25,
            moderate_competition_below: 50,
        }
    }
}

impl MatchingConfig {
    pub fn max_points(&self) -> f64 {
        self.weight_keywords
            + self.weight_remote
            + self.weight_easy_apply
            + self.weight_recency
            + self.weight_competition
    }
}
