pub mod application;
pub mod filters;
pub mod job;

pub use application::{ApplicationRecord, ApplicationStatus, SkippedJob};
pub use filters::{ExperienceLevel, FilterCriteria, JobType, KeywordLogic, RemotePreference};
pub use job::{Job, SalaryPeriod, SalaryRange};
