pub mod config;
pub mod controller;

pub use config::{BreakPattern, PacingConfig, WorkingHours, MAX_SLOWDOWN_FACTOR};
pub use controller::PacingController;
