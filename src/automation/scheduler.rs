use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Suspends the control loop between iterations.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Waits `delay`. Returns false if the wait was cancelled, in which case
    /// the caller must exit instead of running another iteration.
    async fn schedule_next(&self, delay: Duration) -> bool;

    /// Wakes every pending wait with `false`.
    fn cancel(&self);

    /// Makes later waits sleep again after a `cancel`.
    fn rearm(&self);
}

pub struct TokioScheduler {
    token: Mutex<CancellationToken>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            token: Mutex::new(CancellationToken::new()),
        }
    }

    fn current_token(&self) -> CancellationToken {
        match self.token.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn schedule_next(&self, delay: Duration) -> bool {
        let token = self.current_token();
        if token.is_cancelled() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = token.cancelled() => false,
        }
    }

    fn cancel(&self) {
        self.current_token().cancel();
    }

    fn rearm(&self) {
        let mut guard = match self.token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.is_cancelled() {
            *guard = CancellationToken::new();
        }
    }
}
