use log::{info, warn};
use serde::Serialize;

use crate::automation::StatusSnapshot;
use crate::errors::LimitKind;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    ApplicationSubmitted {
        job_id: String,
        title: String,
        company: String,
    },
    #[serde(rename_all = "camelCase")]
    ApplicationFailed {
        job_id: String,
        title: String,
        company: String,
        error: String,
    },
    #[serde(rename_all = "camelCase")]
    JobSkipped { job_id: String, reason: String },
    #[serde(rename_all = "camelCase")]
    LimitReached { limit: LimitKind, count: u32 },
    #[serde(rename_all = "camelCase")]
    FatalStop { error_count: u32, recent_errors: Vec<String> },
    #[serde(rename_all = "camelCase")]
    SessionRotated { session_minutes: i64 },
    #[serde(rename_all = "camelCase")]
    BreakStarted { duration_ms: u64 },
    BreakEnded,
    StateChanged(StatusSnapshot),
}

/// Receives user-facing notifications. Implementations must not block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log; used when the host provides no sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, notification: Notification) {
        match &notification {
            Notification::ApplicationFailed { .. } | Notification::FatalStop { .. } => {
                warn!("notification: {notification:?}")
            }
            _ => info!("notification: {notification:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn notifications_are_tagged_by_kind() {
        let value = serde_json::to_value(Notification::LimitReached {
            limit: LimitKind::Daily,
            count: 50,
        })
        .unwrap();
        assert_eq!(value, json!({"kind": "limitReached", "limit": "daily", "count": 50}));

        let value = serde_json::to_value(Notification::BreakEnded).unwrap();
        assert_eq!(value, json!({"kind": "breakEnded"}));
    }
}
