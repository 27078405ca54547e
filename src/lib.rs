//! Orchestrator and job-matching engine behind an auto-apply browser extension.
//!
//! The host supplies a [`PageAnalyzer`] and a [`FormAutomation`] for the page
//! it controls, a [`KeyValueStore`] for persistence, and drives an
//! [`AutomationController`] through [`Command`] messages.

pub mod automation;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod matching;
pub mod models;
pub mod pacing;
pub mod records;
pub mod storage;
mod utils;

pub use automation::{
    AutomationController, AutomationStatus, Command, CommandResponse, Scheduler, StatusSnapshot,
    TokioScheduler,
};
pub use collaborators::{
    Clock, Collaborators, FormAutomation, Notification, NotificationSink, PageAnalyzer,
    SubmissionOutcome, SystemClock,
};
pub use config::{AutomationConfig, ConfigPatch};
pub use errors::{AutomationError, StartRejection};
pub use matching::{match_job, MatchResult};
pub use models::{ApplicationRecord, FilterCriteria, Job};
pub use records::{Records, Statistics};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};

/// Routes `log` output through `env_logger`. Info by default; `RUST_LOG`
/// overrides. Safe to call more than once.
pub fn init_logging() {
    let initialised = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()
        .is_ok();

    if initialised {
        log::info!("autoapply logging initialised");
    }
}
