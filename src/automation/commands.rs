//! Message surface used by the extension's background script and popup.

use std::fmt::Display;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{AutomationConfig, ConfigPatch};
use crate::models::Job;
use crate::records::Statistics;

use super::controller::AutomationController;
use super::state::StatusSnapshot;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StartOptions {
    /// Applied before the start checks run.
    pub config: Option<ConfigPatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    StartAutomation(StartOptions),
    StopAutomation,
    PauseAutomation,
    ResumeAutomation,
    GetStatus,
    UpdateConfig(ConfigPatch),
    JobsFound(Vec<Job>),
    #[serde(rename_all = "camelCase")]
    ApplicationOutcome {
        job_id: String,
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    BreakStarted { duration_ms: u64 },
    BreakEnded,
    SessionEstablished,
    DailyReset,
    GetStatistics,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum CommandResponse {
    Ack {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Status(StatusSnapshot),
    #[serde(rename_all = "camelCase")]
    Queued { queued_count: usize },
    Config(AutomationConfig),
    Statistics(Statistics),
}

impl CommandResponse {
    pub fn ok() -> Self {
        CommandResponse::Ack {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Display) -> Self {
        CommandResponse::Ack {
            success: false,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, CommandResponse::Ack { success: false, .. })
    }
}

fn ack<T, E: Display>(command: &str, result: Result<T, E>) -> CommandResponse {
    match result {
        Ok(_) => CommandResponse::ok(),
        Err(err) => {
            warn!("{command} rejected: {err}");
            CommandResponse::failed(err)
        }
    }
}

impl AutomationController {
    pub async fn dispatch(&self, command: Command) -> CommandResponse {
        match command {
            Command::StartAutomation(options) => ack("start", self.start(options.config).await),
            Command::StopAutomation => {
                self.stop().await;
                CommandResponse::ok()
            }
            Command::PauseAutomation => {
                self.pause().await;
                CommandResponse::ok()
            }
            Command::ResumeAutomation => ack("resume", self.resume().await),
            Command::GetStatus => CommandResponse::Status(self.status().await),
            Command::UpdateConfig(patch) => match self.update_config(patch).await {
                Ok(config) => CommandResponse::Config(config),
                Err(err) => {
                    warn!("config update rejected: {err}");
                    CommandResponse::failed(err)
                }
            },
            Command::JobsFound(jobs) => CommandResponse::Queued {
                queued_count: self.jobs_found(jobs).await,
            },
            Command::ApplicationOutcome {
                job_id,
                success,
                error,
            } => {
                self.application_outcome(job_id, success, error).await;
                CommandResponse::ok()
            }
            Command::BreakStarted { duration_ms } => ack(
                "break",
                self.break_started(Duration::from_millis(duration_ms)).await,
            ),
            Command::BreakEnded => ack("break end", self.break_ended().await),
            Command::SessionEstablished => {
                self.session_established().await;
                CommandResponse::ok()
            }
            Command::DailyReset => {
                self.daily_reset().await;
                CommandResponse::ok()
            }
            Command::GetStatistics => CommandResponse::Statistics(self.statistics().await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn commands_parse_from_extension_messages() {
        let command: Command = serde_json::from_value(json!({
            "type": "APPLICATION_OUTCOME",
            "payload": {"jobId": "123", "success": false, "error": "captcha"}
        }))
        .unwrap();
        match command {
            Command::ApplicationOutcome {
                job_id,
                success,
                error,
            } => {
                assert_eq!(job_id, "123");
                assert!(!success);
                assert_eq!(error.as_deref(), Some("captcha"));
            }
            other => panic!("unexpected command {other:?}"),
        }

        let command: Command = serde_json::from_value(json!({"type": "GET_STATUS"})).unwrap();
        assert!(matches!(command, Command::GetStatus));

        let command: Command = serde_json::from_value(json!({
            "type": "START_AUTOMATION",
            "payload": {"config": {"pacing": {"sessionLimit": 3}}}
        }))
        .unwrap();
        match command {
            Command::StartAutomation(options) => {
                let pacing = options.config.unwrap().pacing.unwrap();
                assert_eq!(pacing.session_limit, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ack_serializes_without_empty_error() {
        assert_eq!(
            serde_json::to_value(CommandResponse::ok()).unwrap(),
            json!({"type": "ack", "payload": {"success": true}})
        );
        assert_eq!(
            serde_json::to_value(CommandResponse::Queued { queued_count: 2 }).unwrap(),
            json!({"type": "queued", "payload": {"queuedCount": 2}})
        );
        assert!(!CommandResponse::failed("nope").is_success());
    }
}
