//! Failure taxonomy for the automation loop.
//!
//! - gating failures are not errors; they become skip records
//! - [`CollaboratorFailure`] feeds the [`ErrorAggregator`]
//! - [`LimitKind`] describes graceful, user-visible stops
//! - fatal stops come from the aggregator crossing its threshold
//! - persistence failures are logged where they happen and never stop the loop

pub mod aggregator;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::automation::AutomationStatus;

pub use aggregator::{ErrorAggregator, ErrorVerdict, DEFAULT_ERROR_THRESHOLD, MAX_RECENT_ERRORS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LimitKind {
    Daily,
    Session,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LimitKind::Daily => "daily limit",
            LimitKind::Session => "session limit",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Collaborator {
    PageAnalyzer,
    FormAutomation,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::PageAnalyzer => f.write_str("page analyzer"),
            Collaborator::FormAutomation => f.write_str("form automation"),
        }
    }
}

/// A collaborator reported failure, threw, or timed out on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorFailure {
    pub collaborator: Collaborator,
    pub job_id: Option<String>,
    pub message: String,
}

impl fmt::Display for CollaboratorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.job_id {
            Some(job_id) => write!(
                f,
                "{} failed on job {}: {}",
                self.collaborator, job_id, self.message
            ),
            None => write!(f, "{} failed: {}", self.collaborator, self.message),
        }
    }
}

impl std::error::Error for CollaboratorFailure {}

impl CollaboratorFailure {
    pub fn form(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            collaborator: Collaborator::FormAutomation,
            job_id: Some(job_id.into()),
            message: message.into(),
        }
    }

    pub fn page(message: impl Into<String>) -> Self {
        Self {
            collaborator: Collaborator::PageAnalyzer,
            job_id: None,
            message: message.into(),
        }
    }
}

/// Why a `Start` was refused. No transition happens in any of these cases.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StartRejection {
    #[error("daily limit of {limit} applications reached")]
    DailyLimitReached { limit: u32 },
    #[error("outside working hours ({start}-{end})")]
    OutsideWorkingHours { start: String, end: String },
    #[error("no job search page is available")]
    NoPageContext,
    #[error("session expired; re-establish the session before starting")]
    RotationPending,
    #[error("automation is already {0}")]
    AlreadyActive(AutomationStatus),
}

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("start rejected: {0}")]
    StartRejected(#[from] StartRejection),
    #[error("cannot {event} while {status}")]
    InvalidTransition {
        event: &'static str,
        status: AutomationStatus,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_failure_messages() {
        let failure = CollaboratorFailure::form("123", "submit button missing");
        assert_eq!(
            failure.to_string(),
            "form automation failed on job 123: submit button missing"
        );

        let failure = CollaboratorFailure::page("no results container");
        assert_eq!(failure.to_string(), "page analyzer failed: no results container");
    }

    #[test]
    fn start_rejection_wraps_into_automation_error() {
        let err: AutomationError = StartRejection::DailyLimitReached { limit: 25 }.into();
        assert_eq!(
            err.to_string(),
            "start rejected: daily limit of 25 applications reached"
        );
    }
}
