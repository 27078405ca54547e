use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::errors::LimitKind;

use super::config::{PacingConfig, MAX_SLOWDOWN_FACTOR};

/// Delay, limit, break and rotation policy. Holds only its own break counter;
/// automation state is passed in by the caller.
pub struct PacingController {
    config: PacingConfig,
    rng: StdRng,
    consecutive_applications: u32,
    next_break_after: Option<u32>,
    debug_mode: bool,
}

impl PacingController {
    pub fn new(config: PacingConfig) -> Self {
        let debug_mode = std::env::var("AUTOAPPLY_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self::with_rng(config, StdRng::from_entropy(), debug_mode)
    }

    /// Deterministic controller for tests and replays.
    pub fn seeded(config: PacingConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed), false)
    }

    fn with_rng(config: PacingConfig, rng: StdRng, debug_mode: bool) -> Self {
        let mut controller = Self {
            config,
            rng,
            consecutive_applications: 0,
            next_break_after: None,
            debug_mode,
        };
        controller.draw_break_threshold();
        controller
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    pub fn update_config(&mut self, config: PacingConfig) {
        self.config = config;
        self.draw_break_threshold();
    }

    /// Uniform random delay in `[min_delay_ms, max_delay_ms]`.
    pub fn next_delay(&mut self) -> Duration {
        let min = self.config.min_delay_ms;
        let max = self.config.max_delay_ms.max(min);
        if self.debug_mode || min == max {
            return Duration::from_millis(min);
        }
        Duration::from_millis(self.rng.gen_range(min..=max))
    }

    /// Longer-than-normal delay used after a non-fatal error.
    pub fn slowed_delay(&mut self) -> Duration {
        let factor = self.config.error_slowdown_factor;
        let factor = if factor.is_finite() {
            factor.clamp(1.0, MAX_SLOWDOWN_FACTOR)
        } else {
            1.0
        };
        let delay = self.next_delay();
        Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(delay)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.config.idle_interval_ms)
    }

    /// First limit already reached, daily before session.
    pub fn check_limits(&self, applications_today: u32, applications_this_session: u32) -> Option<LimitKind> {
        if applications_today >= self.config.daily_limit {
            Some(LimitKind::Daily)
        } else if applications_this_session >= self.config.session_limit {
            Some(LimitKind::Session)
        } else {
            None
        }
    }

    pub fn within_working_hours(&self, local_time: NaiveTime) -> bool {
        self.config
            .working_hours
            .map(|hours| hours.contains(local_time))
            .unwrap_or(true)
    }

    pub fn session_expired(&self, started_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.config.max_session_duration_minutes {
            Some(minutes) => (now - started_at).num_minutes() >= i64::from(minutes),
            None => false,
        }
    }

    /// Counts a submitted application. Returns the break length once the
    /// current threshold is reached, and draws the next threshold.
    pub fn record_application(&mut self) -> Option<Duration> {
        let pattern = self.config.break_pattern?;
        self.consecutive_applications += 1;

        let threshold = self.next_break_after?;
        if self.consecutive_applications < threshold {
            return None;
        }

        self.consecutive_applications = 0;
        self.draw_break_threshold();
        Some(Duration::from_secs(
            u64::from(pattern.break_duration_minutes) * 60,
        ))
    }

    pub fn consecutive_applications(&self) -> u32 {
        self.consecutive_applications
    }

    pub fn next_break_after(&self) -> Option<u32> {
        self.next_break_after
    }

    /// Forgets the current run; called when a new session starts.
    pub fn reset_session(&mut self) {
        self.consecutive_applications = 0;
        self.draw_break_threshold();
    }

    fn draw_break_threshold(&mut self) {
        self.next_break_after = self.config.break_pattern.map(|pattern| {
            let min = pattern.min_applications.max(1);
            let max = pattern.max_applications.max(min);
            self.rng.gen_range(min..=max)
        });
    }
}
