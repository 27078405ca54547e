use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::collaborators::{Collaborators, Notification, SubmissionOutcome};
use crate::config::{AutomationConfig, ConfigPatch, ConfigStore};
use crate::errors::{AutomationError, CollaboratorFailure, ErrorVerdict, LimitKind, StartRejection};
use crate::matching::{keyword_prefilter, score_job, MatchResult};
use crate::models::{ApplicationRecord, ApplicationStatus, Job, SkippedJob};
use crate::pacing::PacingController;
use crate::records::{DailyCount, Records, Statistics};

use super::loop_worker::{automation_loop, Wake};
use super::scheduler::Scheduler;
use super::state::{AutomationState, PauseReason, StatusSnapshot, StopReason};

pub const NOT_EASY_APPLY: &str = "not easy apply";

/// What the loop does after an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStep {
    Continue(Duration),
    /// Sleep out a break, then resume the pause taken at `epoch`.
    Break { duration: Duration, epoch: u64 },
    Exit,
}

enum Next {
    Rotate { minutes: i64 },
    Limit { kind: LimitKind, count: u32 },
    Process(Job),
    Discover,
}

#[derive(Clone)]
pub struct AutomationController {
    state: Arc<Mutex<AutomationState>>,
    pacing: Arc<Mutex<PacingController>>,
    config: Arc<ConfigStore>,
    records: Records,
    collaborators: Collaborators,
    scheduler: Arc<dyn Scheduler>,
}

impl AutomationController {
    /// Loads config and today's counter from `records`. Nothing runs until `start`.
    pub async fn new(
        records: Records,
        collaborators: Collaborators,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let config = ConfigStore::load(records.clone()).await;
        let pacing = PacingController::new(config.current().pacing);

        let today = collaborators.clock.local_date();
        let state = match records.statistics().await {
            Ok(statistics) => match statistics.daily {
                Some(daily) if daily.date == today => {
                    AutomationState::with_daily_count(daily.date, daily.count)
                }
                _ => AutomationState::with_daily_count(today, 0),
            },
            Err(err) => {
                warn!("Failed to restore daily counter: {err:#}");
                AutomationState::with_daily_count(today, 0)
            }
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            pacing: Arc::new(Mutex::new(pacing)),
            config: Arc::new(config),
            records,
            collaborators,
            scheduler,
        }
    }

    pub(crate) fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }

    pub fn config(&self) -> AutomationConfig {
        self.config.current()
    }

    pub async fn status(&self) -> StatusSnapshot {
        let pacing = self.config.current().pacing;
        self.state.lock().await.snapshot(&pacing)
    }

    pub async fn start(&self, patch: Option<ConfigPatch>) -> Result<StatusSnapshot, AutomationError> {
        if let Some(patch) = patch {
            self.update_config(patch).await?;
        }
        let config = self.config.current();
        let clock = self.collaborators.clock.clone();

        let rolled = {
            let mut state = self.state.lock().await;
            check_startable(&state)?;
            let rolled = state.roll_daily(clock.local_date());
            if state.applications_today >= config.pacing.daily_limit {
                return Err(StartRejection::DailyLimitReached {
                    limit: config.pacing.daily_limit,
                }
                .into());
            }
            rolled.then(|| state.daily_count()).flatten()
        };
        if let Some(daily) = rolled {
            self.save_daily(daily).await;
        }

        if !self.pacing.lock().await.within_working_hours(clock.local_time()) {
            let (start, end) = config
                .pacing
                .working_hours
                .map(|hours| {
                    (
                        hours.start.format("%H:%M").to_string(),
                        hours.end.format("%H:%M").to_string(),
                    )
                })
                .unwrap_or_default();
            return Err(StartRejection::OutsideWorkingHours { start, end }.into());
        }

        if !self.collaborators.page_analyzer.has_valid_context().await {
            return Err(StartRejection::NoPageContext.into());
        }

        let (epoch, snapshot) = {
            let mut state = self.state.lock().await;
            // status may have moved while the page analyzer was answering
            check_startable(&state)?;
            let epoch = state.begin_session(Uuid::new_v4().to_string(), clock.now_utc());
            (epoch, state.snapshot(&config.pacing))
        };
        self.pacing.lock().await.reset_session();

        info!(
            "Automation started (session {})",
            snapshot.session_id.as_deref().unwrap_or_default()
        );
        self.restart_loop(epoch, Wake::Tick(Duration::ZERO)).await;
        self.notify(Notification::StateChanged(snapshot.clone()));
        Ok(snapshot)
    }

    /// No-op unless Running.
    pub async fn pause(&self) -> StatusSnapshot {
        let pacing = self.config.current().pacing;
        let (paused, snapshot) = {
            let mut state = self.state.lock().await;
            let paused = state.pause(PauseReason::Manual).is_some();
            (paused, state.snapshot(&pacing))
        };

        if paused {
            self.scheduler.cancel();
            info!("Automation paused");
            self.notify(Notification::StateChanged(snapshot.clone()));
        }
        snapshot
    }

    pub async fn resume(&self) -> Result<StatusSnapshot, AutomationError> {
        let pacing = self.config.current().pacing;
        let (epoch, snapshot) = {
            let mut state = self.state.lock().await;
            let epoch = state.resume().ok_or(AutomationError::InvalidTransition {
                event: "resume",
                status: state.status,
            })?;
            (epoch, state.snapshot(&pacing))
        };

        info!("Automation resumed");
        self.restart_loop(epoch, Wake::Tick(Duration::ZERO)).await;
        self.notify(Notification::StateChanged(snapshot.clone()));
        Ok(snapshot)
    }

    /// Running|Paused → Idle. An attempt already in flight finishes and is
    /// recorded, but nothing further is dequeued.
    pub async fn stop(&self) -> StatusSnapshot {
        let pacing = self.config.current().pacing;
        let (stopped, snapshot) = {
            let mut state = self.state.lock().await;
            let stopped = state.stop(StopReason::User);
            (stopped, state.snapshot(&pacing))
        };

        if stopped {
            self.scheduler.cancel();
            info!("Automation stopped by user");
            self.notify(Notification::StateChanged(snapshot.clone()));
        }
        snapshot
    }

    pub async fn update_config(&self, patch: ConfigPatch) -> Result<AutomationConfig, AutomationError> {
        let config = self.config.update(patch).await?;
        self.pacing.lock().await.update_config(config.pacing.clone());
        info!("Configuration updated");
        Ok(config)
    }

    /// Scores `jobs` against the active filters and queues the matches.
    /// Returns how many were queued.
    pub async fn jobs_found(&self, jobs: Vec<Job>) -> usize {
        let config = self.config.current();
        let now = self.collaborators.clock.now_utc();
        let mut state = self.state.lock().await;

        let mut queued = 0;
        for mut job in jobs {
            if state.was_processed(&job.id) || state.queue.contains(&job.id) {
                continue;
            }
            if !keyword_prefilter(&job, &config.filters) {
                debug!("Job {} dropped by keyword prefilter", job.id);
                continue;
            }

            let result = score_job(&mut job, &config.filters, &config.matching, now);
            if !result.matches {
                debug!(
                    "Job {} not queued (score {:.2}, failed {:?})",
                    job.id, result.score, result.failed_filters
                );
                continue;
            }
            if state.enqueue(job) {
                queued += 1;
            }
        }
        queued
    }

    /// Outcome of an application submitted outside the loop.
    pub async fn application_outcome(&self, job_id: String, success: bool, error: Option<String>) {
        let now = self.collaborators.clock.now_utc();
        let job = {
            let mut state = self.state.lock().await;
            let job = state.current_job.clone().filter(|job| job.id == job_id);
            state.mark_processed(&job_id);
            state.finish_job(&job_id);
            job
        };

        if success {
            if let Some((duration, epoch)) = self.on_submitted(job.as_ref(), &job_id, 1, now).await {
                self.restart_loop(epoch, Wake::BreakOver(duration)).await;
            }
        } else {
            let message = error.unwrap_or_else(|| "application failed".to_string());
            self.on_failed(job.as_ref(), &job_id, message, 1, now).await;
        }
    }

    pub async fn break_started(&self, duration: Duration) -> Result<StatusSnapshot, AutomationError> {
        let now = self.collaborators.clock.now_utc();
        match self.begin_break(duration, now).await {
            Some(epoch) => {
                self.restart_loop(epoch, Wake::BreakOver(duration)).await;
                Ok(self.status().await)
            }
            None => Err(AutomationError::InvalidTransition {
                event: "start a break",
                status: self.status().await.status,
            }),
        }
    }

    pub async fn break_ended(&self) -> Result<StatusSnapshot, AutomationError> {
        let epoch = self.state.lock().await.loop_epoch();
        match self.end_break_at(epoch).await {
            Some(next) => {
                self.restart_loop(next, Wake::Tick(Duration::ZERO)).await;
                Ok(self.status().await)
            }
            None => Err(AutomationError::InvalidTransition {
                event: "end a break",
                status: self.status().await.status,
            }),
        }
    }

    /// Ends the break paused at `epoch`, if it is still the current pause.
    pub(crate) async fn end_break_at(&self, epoch: u64) -> Option<u64> {
        let pacing = self.config.current().pacing;
        let (next, snapshot) = {
            let mut state = self.state.lock().await;
            let next = state.end_break(epoch)?;
            (next, state.snapshot(&pacing))
        };

        info!("Break over, resuming");
        self.notify(Notification::BreakEnded);
        self.notify(Notification::StateChanged(snapshot));
        Some(next)
    }

    pub async fn session_established(&self) {
        let mut state = self.state.lock().await;
        if state.rotation_pending {
            state.rotation_pending = false;
            info!("Session re-established; start allowed again");
        }
    }

    pub async fn daily_reset(&self) {
        let today = self.collaborators.clock.local_date();
        let daily = {
            let mut state = self.state.lock().await;
            state.reset_daily(today);
            state.daily_count()
        };
        if let Some(daily) = daily {
            self.save_daily(daily).await;
        }
        info!("Daily counter reset for {today}");
    }

    pub async fn statistics(&self) -> Statistics {
        self.records.statistics().await.unwrap_or_else(|err| {
            error!("Failed to read statistics: {err:#}");
            Statistics::default()
        })
    }

    /// Runs one iteration for the current loop epoch. Meant for hosts that
    /// drive the loop themselves with a scheduler that never sleeps.
    pub async fn run_once(&self) -> LoopStep {
        let epoch = self.state.lock().await.loop_epoch();
        self.run_iteration(epoch).await
    }

    /// Epoch left for a loop that was busy when it was resumed.
    pub(crate) async fn take_handoff(&self) -> Option<(u64, Wake)> {
        self.state.lock().await.take_handoff()
    }

    pub(crate) async fn run_iteration(&self, epoch: u64) -> LoopStep {
        let config = self.config.current();
        let clock = self.collaborators.clock.clone();
        let now = clock.now_utc();

        let (next, rolled, snapshot) = {
            let mut state = self.state.lock().await;
            if !state.is_current(epoch) {
                return LoopStep::Exit;
            }

            let rolled = state
                .roll_daily(clock.local_date())
                .then(|| state.daily_count())
                .flatten();

            let pacing = self.pacing.lock().await;
            let expired = state
                .session_started_at
                .filter(|started| pacing.session_expired(*started, now));
            let limit = pacing.check_limits(state.applications_today, state.applications_this_session);
            drop(pacing);

            let next = if let Some(started) = expired {
                state.rotate();
                Next::Rotate {
                    minutes: (now - started).num_minutes(),
                }
            } else if let Some(kind) = limit {
                let count = match kind {
                    LimitKind::Daily => state.applications_today,
                    _ => state.applications_this_session,
                };
                state.stop(StopReason::LimitReached(kind));
                Next::Limit { kind, count }
            } else if let Some(job) = state.take_next_job() {
                Next::Process(job)
            } else {
                state.begin_discovery();
                Next::Discover
            };
            (next, rolled, state.snapshot(&config.pacing))
        };

        if let Some(daily) = rolled {
            self.save_daily(daily).await;
        }

        match next {
            Next::Rotate { minutes } => {
                info!("Session rotated after {minutes} minutes");
                self.notify(Notification::SessionRotated {
                    session_minutes: minutes,
                });
                self.notify(Notification::StateChanged(snapshot));
                LoopStep::Exit
            }
            Next::Limit { kind, count } => {
                info!("Stopping: {kind} reached ({count})");
                self.notify(Notification::LimitReached { limit: kind, count });
                self.notify(Notification::StateChanged(snapshot));
                LoopStep::Exit
            }
            Next::Process(job) => self.process_job(epoch, job, &config, now).await,
            Next::Discover => self.discover(epoch, &config).await,
        }
    }

    async fn discover(&self, epoch: u64, config: &AutomationConfig) -> LoopStep {
        let discovered = self
            .collaborators
            .page_analyzer
            .discover_jobs(&config.filters)
            .await;
        self.state.lock().await.end_discovery();

        match discovered {
            Ok(jobs) => {
                let found = jobs.len();
                let queued = self.jobs_found(jobs).await;
                debug!("Discovered {found} jobs, queued {queued}");
            }
            Err(err) => {
                let failure = CollaboratorFailure::page(format!("{err:#}"));
                if self.record_failure(&failure).await {
                    return LoopStep::Exit;
                }
            }
        }

        if !self.state.lock().await.is_current(epoch) {
            return LoopStep::Exit;
        }
        LoopStep::Continue(self.pacing.lock().await.idle_delay())
    }

    async fn process_job(
        &self,
        epoch: u64,
        mut job: Job,
        config: &AutomationConfig,
        now: DateTime<Utc>,
    ) -> LoopStep {
        let result = score_job(&mut job, &config.filters, &config.matching, now);
        if let Some(reason) = skip_reason(&job, &result) {
            self.record_skip(&job, &reason, now).await;
            return self.after_attempt(epoch, false).await;
        }

        info!("Applying to {} at {} (job {})", job.title, job.company, job.id);
        let outcome = match self
            .collaborators
            .form_automation
            .submit_application(&job)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => SubmissionOutcome::failed(format!("{err:#}")),
        };
        self.state.lock().await.end_attempt(&job.id);

        if outcome.success {
            if let Some((duration, break_epoch)) =
                self.on_submitted(Some(&job), &job.id, outcome.attempts, now).await
            {
                return LoopStep::Break {
                    duration,
                    epoch: break_epoch,
                };
            }
            self.after_attempt(epoch, false).await
        } else {
            let message = outcome
                .error
                .unwrap_or_else(|| "submission failed".to_string());
            if self
                .on_failed(Some(&job), &job.id, message, outcome.attempts, now)
                .await
            {
                return LoopStep::Exit;
            }
            self.after_attempt(epoch, true).await
        }
    }

    async fn after_attempt(&self, epoch: u64, slowed: bool) -> LoopStep {
        if !self.state.lock().await.is_current(epoch) {
            return LoopStep::Exit;
        }
        let mut pacing = self.pacing.lock().await;
        let delay = if slowed {
            pacing.slowed_delay()
        } else {
            pacing.next_delay()
        };
        LoopStep::Continue(delay)
    }

    async fn record_skip(&self, job: &Job, reason: &str, now: DateTime<Utc>) {
        self.state.lock().await.end_attempt(&job.id);
        info!("Skipping job {}: {reason}", job.id);

        let record = ApplicationRecord::for_job(
            job,
            ApplicationStatus::Skipped,
            Some(reason.to_string()),
            1,
            now,
        );
        self.save_application(&record).await;
        if let Err(err) = self
            .records
            .append_skipped(&SkippedJob::new(job, reason, now))
            .await
        {
            error!("Failed to persist skipped job {}: {err:#}", job.id);
        }

        self.notify(Notification::JobSkipped {
            job_id: job.id.clone(),
            reason: reason.to_string(),
        });
    }

    /// Records a submission and returns the break to take, if one is due.
    async fn on_submitted(
        &self,
        job: Option<&Job>,
        job_id: &str,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Option<(Duration, u64)> {
        let record = outcome_record(job, job_id, ApplicationStatus::Submitted, None, attempts, now);
        self.save_application(&record).await;
        let pacing = self.config.current().pacing;

        let (counted, daily) = {
            let mut state = self.state.lock().await;
            let counted = state.record_submission(&pacing);
            (counted, state.daily_count())
        };
        if counted {
            if let Some(daily) = daily {
                self.save_daily(daily).await;
            }
        }

        info!("Application submitted for job {job_id}");
        self.notify(Notification::ApplicationSubmitted {
            job_id: job_id.to_string(),
            title: job.map(|job| job.title.clone()).unwrap_or_default(),
            company: job.map(|job| job.company.clone()).unwrap_or_default(),
        });

        if !counted {
            return None;
        }
        let duration = self.pacing.lock().await.record_application()?;
        let epoch = self.begin_break(duration, now).await?;
        Some((duration, epoch))
    }

    /// Records a failed attempt. Returns true if it tripped the fatal threshold.
    async fn on_failed(
        &self,
        job: Option<&Job>,
        job_id: &str,
        message: String,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> bool {
        let record = outcome_record(
            job,
            job_id,
            ApplicationStatus::Failed,
            Some(message.clone()),
            attempts,
            now,
        );
        self.save_application(&record).await;

        self.notify(Notification::ApplicationFailed {
            job_id: job_id.to_string(),
            title: job.map(|job| job.title.clone()).unwrap_or_default(),
            company: job.map(|job| job.company.clone()).unwrap_or_default(),
            error: message.clone(),
        });

        self.record_failure(&CollaboratorFailure::form(job_id, message))
            .await
    }

    async fn record_failure(&self, failure: &CollaboratorFailure) -> bool {
        warn!("{failure}");
        let pacing = self.config.current().pacing;

        let (verdict, halted, recent, snapshot) = {
            let mut state = self.state.lock().await;
            let verdict = state.record_error(failure.to_string());
            let halted = matches!(verdict, ErrorVerdict::Fatal { .. }) && state.halt();
            (
                verdict,
                halted,
                state.recent_errors().to_vec(),
                state.snapshot(&pacing),
            )
        };

        match verdict {
            ErrorVerdict::Continue { count } => {
                debug!("Error {count} of this run; slowing down");
                false
            }
            ErrorVerdict::Fatal { count } => {
                if halted {
                    self.scheduler.cancel();
                    error!("Stopping after {count} errors");
                    self.notify(Notification::FatalStop {
                        error_count: count,
                        recent_errors: recent,
                    });
                    self.notify(Notification::StateChanged(snapshot));
                }
                true
            }
        }
    }

    /// Running → Paused(Break). Returns the break epoch.
    async fn begin_break(&self, duration: Duration, now: DateTime<Utc>) -> Option<u64> {
        let pacing = self.config.current().pacing;
        let until = now + chrono::Duration::milliseconds(duration.as_millis() as i64);
        let (epoch, snapshot) = {
            let mut state = self.state.lock().await;
            let epoch = state.pause(PauseReason::Break { until })?;
            (epoch, state.snapshot(&pacing))
        };

        info!("Taking a {} minute break", duration.as_secs() / 60);
        self.notify(Notification::BreakStarted {
            duration_ms: duration.as_millis() as u64,
        });
        self.notify(Notification::StateChanged(snapshot));
        Some(epoch)
    }

    /// Wakes any sleeping loop and runs `epoch` on a single loop: the one
    /// still submitting an application if there is one, a fresh one otherwise.
    async fn restart_loop(&self, epoch: u64, wake: Wake) {
        self.scheduler.cancel();
        self.scheduler.rearm();
        if self.state.lock().await.hand_off(epoch, wake) {
            debug!("Attempt in flight; its loop continues with epoch {epoch}");
            return;
        }
        tokio::spawn(automation_loop(self.clone(), epoch, wake));
    }

    async fn save_application(&self, record: &ApplicationRecord) {
        if let Err(err) = self.records.append_application(record).await {
            error!(
                "Failed to persist application record for job {}: {err:#}",
                record.job_id
            );
        }
    }

    async fn save_daily(&self, daily: DailyCount) {
        if let Err(err) = self.records.save_daily_count(daily).await {
            error!("Failed to persist daily counter: {err:#}");
        }
    }

    fn notify(&self, notification: Notification) {
        self.collaborators.notifier.notify(notification);
    }
}

fn check_startable(state: &AutomationState) -> Result<(), StartRejection> {
    if state.is_active() {
        return Err(StartRejection::AlreadyActive(state.status));
    }
    if state.rotation_pending {
        return Err(StartRejection::RotationPending);
    }
    Ok(())
}

fn skip_reason(job: &Job, result: &MatchResult) -> Option<String> {
    if !result.failed_filters.is_empty() {
        return Some(result.failed_filters.join(", "));
    }
    if !result.matches {
        return Some(format!("match score {:.2} below threshold", result.score));
    }
    if !job.is_easy_apply {
        return Some(NOT_EASY_APPLY.to_string());
    }
    None
}

fn outcome_record(
    job: Option<&Job>,
    job_id: &str,
    status: ApplicationStatus,
    error: Option<String>,
    attempts: u32,
    now: DateTime<Utc>,
) -> ApplicationRecord {
    match job {
        Some(job) => ApplicationRecord::for_job(job, status, error, attempts, now),
        None => {
            let mut record = ApplicationRecord::for_job_id(job_id, status, error, now);
            record.attempts = attempts.max(1);
            record
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn skip_reason_prefers_hard_filters() {
        let job = Job::new("1", "Engineer", "Acme", Utc::now());
        let result = MatchResult {
            matches: false,
            score: 0.9,
            reasons: vec![],
            failed_filters: vec!["company excluded".into()],
        };
        assert_eq!(skip_reason(&job, &result).as_deref(), Some("company excluded"));

        let result = MatchResult {
            matches: false,
            score: 0.3,
            reasons: vec![],
            failed_filters: vec![],
        };
        assert_eq!(
            skip_reason(&job, &result).as_deref(),
            Some("match score 0.30 below threshold")
        );
    }

    #[test]
    fn matching_job_without_easy_apply_is_skipped() {
        let mut job = Job::new("1", "Engineer", "Acme", Utc::now());
        let result = MatchResult {
            matches: true,
            score: 0.8,
            reasons: vec![],
            failed_filters: vec![],
        };
        assert_eq!(skip_reason(&job, &result).as_deref(), Some(NOT_EASY_APPLY));

        job.is_easy_apply = true;
        assert_eq!(skip_reason(&job, &result), None);
    }

    #[test]
    fn outcome_without_job_keeps_attempts() {
        let record = outcome_record(
            None,
            "42",
            ApplicationStatus::Failed,
            Some("timeout".into()),
            3,
            Utc::now(),
        );
        assert_eq!(record.job_id, "42");
        assert_eq!(record.attempts, 3);
        assert!(record.company.is_none());
    }
}
