pub mod commands;
pub mod controller;
pub mod loop_worker;
pub mod queue;
pub mod scheduler;
pub mod state;

pub use commands::{Command, CommandResponse, StartOptions};
pub use controller::{AutomationController, LoopStep, NOT_EASY_APPLY};
pub use queue::JobQueue;
pub use scheduler::{Scheduler, TokioScheduler};
pub use state::{
    AutomationState, AutomationStatus, CurrentJob, PauseReason, StatusSnapshot, StopReason,
};
