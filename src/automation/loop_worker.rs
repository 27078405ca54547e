use std::time::Duration;

use super::controller::{AutomationController, LoopStep};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// What the next wait is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Tick(Duration),
    /// Resume the break paused at the loop's epoch once the wait is over.
    BreakOver(Duration),
}

/// Drives iterations until the controller retires `epoch` or the scheduler
/// is cancelled. A break, or a resume that lands mid-attempt, hands the loop
/// a new epoch.
pub async fn automation_loop(controller: AutomationController, mut epoch: u64, mut wake: Wake) {
    log_info!("automation loop started (epoch {})", epoch);

    loop {
        let delay = match wake {
            Wake::Tick(delay) | Wake::BreakOver(delay) => delay,
        };
        if !controller.scheduler().schedule_next(delay).await {
            log_info!("automation loop cancelled (epoch {})", epoch);
            break;
        }

        if let Wake::BreakOver(_) = wake {
            match controller.end_break_at(epoch).await {
                Some(next) => epoch = next,
                None => {
                    log_info!("break already ended elsewhere (epoch {})", epoch);
                    break;
                }
            }
        }

        wake = match controller.run_iteration(epoch).await {
            LoopStep::Continue(next) => {
                log_debug!("next iteration in {}ms", next.as_millis());
                Wake::Tick(next)
            }
            LoopStep::Break {
                duration,
                epoch: break_epoch,
            } => {
                epoch = break_epoch;
                Wake::BreakOver(duration)
            }
            LoopStep::Exit => match controller.take_handoff().await {
                Some((next, next_wake)) => {
                    log_info!("automation loop taking over epoch {}", next);
                    epoch = next;
                    next_wake
                }
                None => {
                    log_info!("automation loop exiting (epoch {})", epoch);
                    break;
                }
            },
        };
    }
}
