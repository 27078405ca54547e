use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorAggregator, ErrorVerdict, LimitKind};
use crate::models::Job;
use crate::pacing::PacingConfig;
use crate::records::DailyCount;

use super::loop_worker::Wake;
use super::queue::JobQueue;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AutomationStatus {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl Default for AutomationStatus {
    fn default() -> Self {
        AutomationStatus::Idle
    }
}

impl fmt::Display for AutomationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AutomationStatus::Idle => "idle",
            AutomationStatus::Running => "running",
            AutomationStatus::Paused => "paused",
            AutomationStatus::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PauseReason {
    Manual,
    Break { until: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    User,
    LimitReached(LimitKind),
    FatalErrors,
    SessionRotation,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentJob {
    pub id: String,
    pub title: String,
    pub company: String,
}

/// Point-in-time view returned by `GetStatus` and carried by state-change
/// notifications.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: AutomationStatus,
    pub session_id: Option<String>,
    pub applications_today: u32,
    pub applications_this_session: u32,
    pub daily_limit: u32,
    pub session_limit: u32,
    pub queue_length: usize,
    pub current_job: Option<CurrentJob>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub recent_errors: Vec<String>,
    pub error_count: u32,
    pub break_until: Option<DateTime<Utc>>,
    pub rotation_pending: bool,
    pub last_stop_reason: Option<StopReason>,
}

/// Orchestrator state. Fields that must move together are only changed
/// through the transition methods below.
#[derive(Debug, Default)]
pub struct AutomationState {
    pub status: AutomationStatus,
    pub current_job: Option<Job>,
    pub queue: JobQueue,
    pub applications_today: u32,
    pub applications_this_session: u32,
    pub session_started_at: Option<DateTime<Utc>>,
    pub session_id: Option<String>,
    pub pause_reason: Option<PauseReason>,
    pub counter_date: Option<NaiveDate>,
    pub rotation_pending: bool,
    pub last_stop_reason: Option<StopReason>,
    /// Bumped whenever a running loop must retire.
    loop_epoch: u64,
    /// Set while the loop awaits a collaborator: a submission or a discovery.
    loop_busy: bool,
    /// Epoch left for the busy loop to pick up once its attempt settles.
    handoff: Option<(u64, Wake)>,
    processed_ids: HashSet<String>,
    errors: ErrorAggregator,
}

impl AutomationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the daily counter persisted by an earlier run.
    pub fn with_daily_count(date: NaiveDate, count: u32) -> Self {
        Self {
            applications_today: count,
            counter_date: Some(date),
            ..Self::default()
        }
    }

    pub fn loop_epoch(&self) -> u64 {
        self.loop_epoch
    }

    /// True while the loop holding `epoch` may keep going.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.status == AutomationStatus::Running && self.loop_epoch == epoch
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            AutomationStatus::Running | AutomationStatus::Paused
        )
    }

    pub fn recent_errors(&self) -> &[String] {
        self.errors.recent()
    }

    pub fn error_count(&self) -> u32 {
        self.errors.count()
    }

    pub fn was_processed(&self, job_id: &str) -> bool {
        self.processed_ids.contains(job_id)
    }

    /// Enters Running for a fresh session and returns the new loop epoch.
    pub fn begin_session(&mut self, session_id: String, started_at: DateTime<Utc>) -> u64 {
        self.status = AutomationStatus::Running;
        self.session_id = Some(session_id);
        self.session_started_at = Some(started_at);
        self.applications_this_session = 0;
        self.pause_reason = None;
        self.current_job = None;
        self.last_stop_reason = None;
        self.processed_ids.clear();
        self.errors.reset();
        self.bump_epoch()
    }

    /// Running → Paused. Returns the epoch a break timer must present to
    /// resume, or `None` when not Running.
    pub fn pause(&mut self, reason: PauseReason) -> Option<u64> {
        if self.status != AutomationStatus::Running {
            return None;
        }
        self.status = AutomationStatus::Paused;
        self.pause_reason = Some(reason);
        Some(self.bump_epoch())
    }

    /// Paused → Running. Returns the new loop epoch.
    pub fn resume(&mut self) -> Option<u64> {
        if self.status != AutomationStatus::Paused {
            return None;
        }
        self.status = AutomationStatus::Running;
        self.pause_reason = None;
        Some(self.bump_epoch())
    }

    /// Resumes only if the break paused at `epoch` is still the current pause.
    pub fn end_break(&mut self, epoch: u64) -> Option<u64> {
        let on_break = matches!(self.pause_reason, Some(PauseReason::Break { .. }));
        if self.status != AutomationStatus::Paused || !on_break || self.loop_epoch != epoch {
            return None;
        }
        self.resume()
    }

    pub fn break_until(&self) -> Option<DateTime<Utc>> {
        match (self.status, self.pause_reason) {
            (AutomationStatus::Paused, Some(PauseReason::Break { until })) => Some(until),
            _ => None,
        }
    }

    /// Running|Paused → Idle, dropping queued work.
    pub fn stop(&mut self, reason: StopReason) -> bool {
        self.end_session(AutomationStatus::Idle, reason)
    }

    /// Running|Paused → Stopped after too many errors.
    pub fn halt(&mut self) -> bool {
        self.end_session(AutomationStatus::Stopped, StopReason::FatalErrors)
    }

    /// Ends the session on max duration; Start stays refused until the host
    /// re-establishes the session.
    pub fn rotate(&mut self) -> bool {
        let stopped = self.end_session(AutomationStatus::Idle, StopReason::SessionRotation);
        if stopped {
            self.rotation_pending = true;
        }
        stopped
    }

    fn end_session(&mut self, status: AutomationStatus, reason: StopReason) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = status;
        self.pause_reason = None;
        self.current_job = None;
        self.queue.clear();
        self.last_stop_reason = Some(reason);
        self.bump_epoch();
        true
    }

    /// Starts a new daily counter if the local date moved on.
    pub fn roll_daily(&mut self, today: NaiveDate) -> bool {
        if self.counter_date == Some(today) {
            return false;
        }
        self.reset_daily(today);
        true
    }

    pub fn reset_daily(&mut self, today: NaiveDate) {
        self.applications_today = 0;
        self.counter_date = Some(today);
    }

    pub fn daily_count(&self) -> Option<DailyCount> {
        self.counter_date.map(|date| DailyCount {
            date,
            count: self.applications_today,
        })
    }

    /// Counts a submitted application. Counters only move while Running and
    /// never past the configured limits.
    pub fn record_submission(&mut self, pacing: &PacingConfig) -> bool {
        if self.status != AutomationStatus::Running
            || self.applications_today >= pacing.daily_limit
            || self.applications_this_session >= pacing.session_limit
        {
            return false;
        }
        self.applications_today += 1;
        self.applications_this_session += 1;
        true
    }

    pub fn record_error(&mut self, message: impl Into<String>) -> ErrorVerdict {
        self.errors.record(message)
    }

    /// Moves the queue head into `current_job` and marks the attempt in flight.
    pub fn take_next_job(&mut self) -> Option<Job> {
        let job = self.queue.pop_front()?;
        self.processed_ids.insert(job.id.clone());
        self.current_job = Some(job.clone());
        self.loop_busy = true;
        Some(job)
    }

    pub fn loop_busy(&self) -> bool {
        self.loop_busy
    }

    /// Settles the attempt started by `take_next_job`.
    pub fn end_attempt(&mut self, job_id: &str) {
        self.loop_busy = false;
        self.finish_job(job_id);
    }

    pub fn begin_discovery(&mut self) {
        self.loop_busy = true;
    }

    pub fn end_discovery(&mut self) {
        self.loop_busy = false;
    }

    /// Leaves `epoch` for the loop that is still awaiting a collaborator.
    /// Returns false when the loop is idle and the caller has to spawn one.
    pub fn hand_off(&mut self, epoch: u64, wake: Wake) -> bool {
        if self.loop_busy {
            self.handoff = Some((epoch, wake));
            true
        } else {
            self.handoff = None;
            false
        }
    }

    /// Epoch handed to the exiting loop, if it is still the current one.
    pub fn take_handoff(&mut self) -> Option<(u64, Wake)> {
        self.handoff
            .take()
            .filter(|(epoch, _)| *epoch == self.loop_epoch)
    }

    pub fn mark_processed(&mut self, job_id: &str) {
        self.processed_ids.insert(job_id.to_string());
    }

    pub fn finish_job(&mut self, job_id: &str) {
        if self.current_job.as_ref().map(|job| job.id.as_str()) == Some(job_id) {
            self.current_job = None;
        }
    }

    /// Queues a scored job unless it was already queued or attempted.
    pub fn enqueue(&mut self, job: Job) -> bool {
        if self.processed_ids.contains(&job.id) {
            return false;
        }
        self.queue.push(job)
    }

    pub fn snapshot(&self, pacing: &PacingConfig) -> StatusSnapshot {
        StatusSnapshot {
            status: self.status,
            session_id: self.session_id.clone(),
            applications_today: self.applications_today,
            applications_this_session: self.applications_this_session,
            daily_limit: pacing.daily_limit,
            session_limit: pacing.session_limit,
            queue_length: self.queue.len(),
            current_job: self.current_job.as_ref().map(|job| CurrentJob {
                id: job.id.clone(),
                title: job.title.clone(),
                company: job.company.clone(),
            }),
            session_started_at: self.session_started_at,
            recent_errors: self.errors.recent().to_vec(),
            error_count: self.errors.count(),
            break_until: self.break_until(),
            rotation_pending: self.rotation_pending,
            last_stop_reason: self.last_stop_reason,
        }
    }

    fn bump_epoch(&mut self) -> u64 {
        self.loop_epoch += 1;
        self.loop_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job(id: &str, score: f64) -> Job {
        let mut job = Job::new(id, "Engineer", "Acme", Utc::now());
        job.match_score = score;
        job
    }

    #[test]
    fn session_lifecycle_bumps_epoch() {
        let mut state = AutomationState::new();
        let first = state.begin_session("s1".into(), Utc::now());
        assert!(state.is_current(first));

        let paused = state.pause(PauseReason::Manual).unwrap();
        assert!(!state.is_current(first));
        assert!(!state.is_current(paused));

        let resumed = state.resume().unwrap();
        assert!(state.is_current(resumed));
        assert!(resumed > paused);

        state.enqueue(job("a", 0.9));
        assert!(state.stop(StopReason::User));
        assert_eq!(state.status, AutomationStatus::Idle);
        assert!(state.queue.is_empty());
        assert!(!state.is_current(resumed));
        assert!(!state.stop(StopReason::User));
    }

    #[test]
    fn pause_and_resume_need_the_right_status() {
        let mut state = AutomationState::new();
        assert!(state.pause(PauseReason::Manual).is_none());
        assert!(state.resume().is_none());
        assert_eq!(state.status, AutomationStatus::Idle);
    }

    #[test]
    fn stale_break_timer_cannot_resume() {
        let mut state = AutomationState::new();
        state.begin_session("s1".into(), Utc::now());
        let until = Utc::now() + Duration::minutes(15);
        let break_epoch = state.pause(PauseReason::Break { until }).unwrap();
        assert_eq!(state.break_until(), Some(until));

        // user resumes and pauses manually before the timer fires
        state.resume();
        state.pause(PauseReason::Manual);
        assert!(state.end_break(break_epoch).is_none());
        assert_eq!(state.status, AutomationStatus::Paused);
    }

    #[test]
    fn counters_only_move_while_running() {
        let pacing = PacingConfig::default();
        let mut state = AutomationState::new();
        assert!(!state.record_submission(&pacing));

        state.begin_session("s1".into(), Utc::now());
        assert!(state.record_submission(&pacing));
        state.pause(PauseReason::Manual);
        assert!(!state.record_submission(&pacing));
        assert_eq!(state.applications_today, 1);
        assert_eq!(state.applications_this_session, 1);
    }

    #[test]
    fn counters_stop_at_the_limits() {
        let pacing = PacingConfig {
            session_limit: 1,
            ..PacingConfig::default()
        };
        let mut state = AutomationState::new();
        state.begin_session("s1".into(), Utc::now());
        assert!(state.record_submission(&pacing));
        assert!(!state.record_submission(&pacing));
        assert_eq!(state.applications_this_session, 1);
        assert_eq!(state.applications_today, 1);
    }

    #[test]
    fn busy_loop_takes_over_the_resumed_epoch() {
        let mut state = AutomationState::new();
        state.begin_session("s1".into(), Utc::now());
        state.enqueue(job("a", 0.8));
        state.take_next_job().unwrap();

        state.pause(PauseReason::Manual);
        let resumed = state.resume().unwrap();
        assert!(state.hand_off(resumed, Wake::Tick(std::time::Duration::ZERO)));

        state.end_attempt("a");
        assert!(!state.loop_busy());
        assert_eq!(
            state.take_handoff(),
            Some((resumed, Wake::Tick(std::time::Duration::ZERO)))
        );
        assert_eq!(state.take_handoff(), None);
        // nothing in flight: the caller spawns
        assert!(!state.hand_off(resumed, Wake::Tick(std::time::Duration::ZERO)));
    }

    #[test]
    fn stale_handoff_is_dropped() {
        let mut state = AutomationState::new();
        state.begin_session("s1".into(), Utc::now());
        state.enqueue(job("a", 0.8));
        state.take_next_job().unwrap();

        state.pause(PauseReason::Manual);
        let resumed = state.resume().unwrap();
        state.hand_off(resumed, Wake::Tick(std::time::Duration::ZERO));
        state.stop(StopReason::User);
        state.end_attempt("a");
        assert_eq!(state.take_handoff(), None);
    }

    #[test]
    fn daily_counter_rolls_with_the_date() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut state = AutomationState::with_daily_count(day, 7);
        assert!(!state.roll_daily(day));
        assert_eq!(state.applications_today, 7);

        assert!(state.roll_daily(day.succ_opt().unwrap()));
        assert_eq!(state.applications_today, 0);
    }

    #[test]
    fn processed_jobs_are_not_requeued() {
        let mut state = AutomationState::new();
        state.begin_session("s1".into(), Utc::now());
        assert!(state.enqueue(job("a", 0.8)));
        let taken = state.take_next_job().unwrap();
        assert_eq!(state.current_job.as_ref().unwrap().id, "a");

        assert!(!state.enqueue(job("a", 0.8)));
        state.finish_job(&taken.id);
        assert!(state.current_job.is_none());
    }

    #[test]
    fn rotation_sets_pending_flag() {
        let mut state = AutomationState::new();
        state.begin_session("s1".into(), Utc::now());
        assert!(state.rotate());
        assert!(state.rotation_pending);
        assert_eq!(state.status, AutomationStatus::Idle);
        assert_eq!(state.last_stop_reason, Some(StopReason::SessionRotation));
    }
}
