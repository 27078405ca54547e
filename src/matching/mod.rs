pub mod config;
pub mod engine;
pub mod gating;
pub mod scoring;

pub use config::{MatchingConfig, ACCEPTANCE_THRESHOLD};
pub use engine::{keyword_prefilter, match_job, match_job_with, score_job, MatchResult};
