//! Seams to the host: page scraping, form filling, user notifications and time.

pub mod clock;
pub mod notifications;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{FilterCriteria, Job};

pub use clock::{Clock, SystemClock};
pub use notifications::{LogNotificationSink, Notification, NotificationSink};

/// Reads job listings from the current page.
#[async_trait]
pub trait PageAnalyzer: Send + Sync {
    /// Whether a job search page is open and readable.
    async fn has_valid_context(&self) -> bool;

    /// Jobs currently visible. The criteria let the analyzer narrow its search.
    async fn discover_jobs(&self, filters: &FilterCriteria) -> Result<Vec<Job>>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub success: bool,
    pub error: Option<String>,
    /// Form pages or retries the collaborator went through.
    pub attempts: u32,
}

impl SubmissionOutcome {
    pub fn submitted() -> Self {
        Self {
            success: true,
            error: None,
            attempts: 1,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            attempts: 1,
        }
    }
}

/// Fills and submits the application form for a job.
///
/// A reported failure and an `Err` are handled the same way by the
/// orchestrator; timeouts are the collaborator's own business.
#[async_trait]
pub trait FormAutomation: Send + Sync {
    async fn submit_application(&self, job: &Job) -> Result<SubmissionOutcome>;
}

/// Everything the orchestrator talks to besides storage.
#[derive(Clone)]
pub struct Collaborators {
    pub page_analyzer: Arc<dyn PageAnalyzer>,
    pub form_automation: Arc<dyn FormAutomation>,
    pub notifier: Arc<dyn NotificationSink>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Logs notifications and reads the system clock.
    pub fn new(page_analyzer: Arc<dyn PageAnalyzer>, form_automation: Arc<dyn FormAutomation>) -> Self {
        Self {
            page_analyzer,
            form_automation,
            notifier: Arc::new(LogNotificationSink),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
