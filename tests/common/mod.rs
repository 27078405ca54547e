#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use tokio::sync::Semaphore;

use autoapply::collaborators::{Clock, Collaborators, Notification, NotificationSink};
use autoapply::models::{FilterCriteria, Job};
use autoapply::pacing::PacingConfig;
use autoapply::{
    AutomationConfig, AutomationController, FormAutomation, MemoryStore, PageAnalyzer, Records,
    Scheduler, SubmissionOutcome,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap()
}

/// Treats UTC as local time so working hours and dates are predictable.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn local_time(&self) -> NaiveTime {
        self.now_utc().time()
    }

    fn local_date(&self) -> NaiveDate {
        self.now_utc().date_naive()
    }
}

#[derive(Default)]
pub struct FakePageAnalyzer {
    pub invalid_context: AtomicBool,
    pub fail_discovery: AtomicBool,
    visible: Mutex<Vec<Job>>,
}

impl FakePageAnalyzer {
    /// Jobs handed out by the next discovery.
    pub fn show(&self, jobs: Vec<Job>) {
        *self.visible.lock().unwrap() = jobs;
    }
}

#[async_trait]
impl PageAnalyzer for FakePageAnalyzer {
    async fn has_valid_context(&self) -> bool {
        !self.invalid_context.load(Ordering::SeqCst)
    }

    async fn discover_jobs(&self, _filters: &FilterCriteria) -> Result<Vec<Job>> {
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(anyhow!("results list not found"));
        }
        Ok(std::mem::take(&mut *self.visible.lock().unwrap()))
    }
}

/// Succeeds unless told otherwise; remembers every job it was asked to submit.
#[derive(Default)]
pub struct FakeFormAutomation {
    pub always_fail: AtomicBool,
    scripted: Mutex<VecDeque<Result<SubmissionOutcome, String>>>,
    submitted: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeFormAutomation {
    /// Makes submissions wait until the returned gate is given permits.
    pub fn hold(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Most submissions ever running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn script(&self, outcome: Result<SubmissionOutcome, String>) {
        self.scripted.lock().unwrap().push_back(outcome);
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl FormAutomation for FakeFormAutomation {
    async fn submit_application(&self, job: &Job) -> Result<SubmissionOutcome> {
        self.submitted.lock().unwrap().push(job.id.clone());
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await?;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.always_fail.load(Ordering::SeqCst) {
            return Err(anyhow!("submit button not found"));
        }
        match self.scripted.lock().unwrap().pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(SubmissionOutcome::submitted()),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn any(&self, predicate: impl Fn(&Notification) -> bool) -> bool {
        self.notifications.lock().unwrap().iter().any(predicate)
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

/// Never sleeps: every spawned loop exits at its first wait, so tests step
/// the controller with `run_once`.
#[derive(Default)]
pub struct ParkedScheduler {
    delays: Mutex<Vec<Duration>>,
}

impl ParkedScheduler {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scheduler for ParkedScheduler {
    async fn schedule_next(&self, delay: Duration) -> bool {
        self.delays.lock().unwrap().push(delay);
        false
    }

    fn cancel(&self) {}

    fn rearm(&self) {}
}

pub struct Harness {
    pub controller: AutomationController,
    pub page: Arc<FakePageAnalyzer>,
    pub form: Arc<FakeFormAutomation>,
    pub sink: Arc<RecordingSink>,
    pub clock: Arc<FixedClock>,
    pub store: MemoryStore,
    pub records: Records,
}

/// Fixed 1s delays, no breaks, no rotation.
pub fn test_config() -> AutomationConfig {
    AutomationConfig {
        pacing: PacingConfig {
            min_delay_ms: 1_000,
            max_delay_ms: 1_000,
            break_pattern: None,
            max_session_duration_minutes: None,
            idle_interval_ms: 500,
            ..PacingConfig::default()
        },
        ..AutomationConfig::default()
    }
}

impl Harness {
    pub async fn new(config: AutomationConfig) -> Self {
        Self::with_scheduler(config, Arc::new(ParkedScheduler::default())).await
    }

    pub async fn with_scheduler(config: AutomationConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        let store = MemoryStore::new();
        let records = Records::new(Arc::new(store.clone()));
        records.save_config(&config).await.unwrap();

        let page = Arc::new(FakePageAnalyzer::default());
        let form = Arc::new(FakeFormAutomation::default());
        let sink = Arc::new(RecordingSink::default());
        let clock = Arc::new(FixedClock::new(t0()));

        let collaborators = Collaborators::new(page.clone(), form.clone())
            .with_notifier(sink.clone())
            .with_clock(clock.clone());
        let controller = AutomationController::new(records.clone(), collaborators, scheduler).await;

        Self {
            controller,
            page,
            form,
            sink,
            clock,
            store,
            records,
        }
    }
}

/// Fresh easy-apply listing; with default filters it scores 0.7, or 0.8 with
/// under 25 applicants.
pub fn job(id: &str, applicants: Option<u32>) -> Job {
    let mut job = Job::new(id, "Backend Engineer", "Acme", t0() - chrono::Duration::hours(2));
    job.is_easy_apply = true;
    job.applicant_count = applicants;
    job.location = "Remote".into();
    job
}
